//! End-to-end scenarios driving the full pipeline through [`a2lparser::parse_file`].

use std::io::Write;

use a2lparser::config::ParserConfig;
use a2lparser::a2l_parser::A2lParseError;
use a2lparser::Error;

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".a2l").tempfile().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

#[test]
fn minimal_project_has_two_root_children_with_their_declared_parameters() {
    let file = write_temp(
        "ASAP2_VERSION 1 60\n\
         /begin PROJECT p \"demo\"\n\
         /begin MODULE m \"\"\n\
         /end MODULE\n\
         /end PROJECT\n",
    );
    let config = ParserConfig::default();
    let outcome = a2lparser::parse_file(file.path(), &config).unwrap();

    assert_eq!(outcome.root.keywords.len(), 2);

    let version = outcome.root.child("Asap2Version").unwrap();
    assert_eq!(version.parameters[0].as_uint(), Some(1));
    assert_eq!(version.parameters[1].as_uint(), Some(60));

    let project = outcome.root.child("Project").unwrap();
    assert_eq!(project.parameters[0].as_str(), Some("p"));
    assert_eq!(project.parameters[1].as_str(), Some("demo"));
    assert_eq!(project.keywords.len(), 1);
    assert_eq!(project.child("Module").unwrap().parameters[0].as_str(), Some("m"));
}

#[test]
fn escaped_quote_in_a_string_parameter_collapses_to_one_quote() {
    let file = write_temp(
        "/begin PROJECT p \"He said \"\"hi\"\"\"\n\
         /begin MODULE m \"\"\n\
         /end MODULE\n\
         /end PROJECT\n",
    );
    let config = ParserConfig::default();
    let outcome = a2lparser::parse_file(file.path(), &config).unwrap();
    let project = outcome.root.child("Project").unwrap();
    assert_eq!(project.parameters[1].as_str(), Some("He said \"hi\""));
}

#[test]
fn out_of_range_version_number_is_a_fatal_validation_error() {
    let file = write_temp("ASAP2_VERSION 1 100000\n");
    let config = ParserConfig::default();
    let err = a2lparser::parse_file(file.path(), &config).unwrap_err();
    match err {
        Error::A2l(A2lParseError::InvalidParameterValue { found, expected_range, .. }) => {
            assert_eq!(found, "100000");
            assert_eq!(expected_range, "0..=65535");
        }
        other => panic!("expected InvalidParameterValue, got {:?}", other),
    }
}

#[test]
fn circular_include_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let a_path = dir.path().join("a.a2l");
    let b_path = dir.path().join("b.a2l");
    std::fs::write(&a_path, "/include \"b.a2l\"\n").unwrap();
    std::fs::write(&b_path, "/include \"a.a2l\"\n").unwrap();

    let config = ParserConfig::default();
    let err = a2lparser::parse_file(&a_path, &config).unwrap_err();
    match err {
        Error::Preprocess(e) => {
            let message = e.to_string();
            assert!(message.contains("circular include"), "{}", message);
        }
        other => panic!("expected a preprocessor error, got {:?}", other),
    }
}

#[test]
fn aml_grammar_round_trips_through_the_binary_codec() {
    let file = a2lparser::compile_aml("/begin A2ML struct S { uint; } /end A2ML").unwrap();
    assert_eq!(file.name, "A2ML");
    let bytes = a2lparser::marshal(&file);
    let back = a2lparser::unmarshal(&bytes).unwrap();
    assert_eq!(file, back);
}

#[test]
fn if_data_body_is_retrievable_verbatim_and_interpreted_against_the_grammar() {
    let file = write_temp(
        "/begin A2ML\n\
         block \"IF_DATA\" struct { uint; };\n\
         /end A2ML\n\
         /begin PROJECT p \"\"\n\
         /begin MODULE m \"\"\n\
         /begin IF_DATA S_PARAMS\n\
         7\n\
         /end IF_DATA\n\
         /end MODULE\n\
         /end PROJECT\n",
    );
    let config = ParserConfig::default();
    let outcome = a2lparser::parse_file(file.path(), &config).unwrap();
    assert!(outcome.warnings.is_empty());

    let module = outcome.root.child("Project").unwrap().child("Module").unwrap();
    let if_data_node = module.child("IF_DATA").expect("module should carry a parsed IF_DATA child");
    let if_data = if_data_node.if_data.as_ref().expect("IF_DATA child should carry an interpreted value");
    match if_data {
        a2lparser::IfDataValue::Struct(members) => {
            assert_eq!(members.len(), 1);
            assert_eq!(members[0], a2lparser::IfDataValue::Scalar(a2lparser::AsamValue::UInt(7)));
        }
        other => panic!("expected a struct IF_DATA value, got {:?}", other),
    }
}
