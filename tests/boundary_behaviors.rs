//! Boundary behaviors of individual parameter shapes, driven end to end
//! through [`a2lparser::parse_file`] rather than through the schema table
//! directly, so a regression in the driver's consumption loop shows up here.

use std::io::Write;

use a2lparser::config::ParserConfig;
use a2lparser::a2l_parser::A2lParseError;
use a2lparser::Error;
use rstest::rstest;

fn write_temp(contents: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".a2l").tempfile().unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    f
}

fn module_body(inner: &str) -> String {
    format!(
        "/begin PROJECT p \"\"\n/begin MODULE m \"\"\n{}\n/end MODULE\n/end PROJECT\n",
        inner
    )
}

#[rstest]
#[case("-1")]
#[case("65536")]
fn uint_parameter_rejects_out_of_range_values(#[case] bad: &str) {
    let file = write_temp(&format!("ASAP2_VERSION 1 {}\n", bad));
    let err = a2lparser::parse_file(file.path(), &ParserConfig::default()).unwrap_err();
    assert!(matches!(err, Error::A2l(A2lParseError::InvalidParameterValue { .. })));
}

#[test]
fn uint_parameter_accepts_its_boundary_value() {
    let file = write_temp("ASAP2_VERSION 1 65535\n");
    let outcome = a2lparser::parse_file(file.path(), &ParserConfig::default()).unwrap();
    let version = outcome.root.child("Asap2Version").unwrap();
    assert_eq!(version.parameters[1].as_uint(), Some(65535));
}

#[rstest]
#[case("UBYTE", true)]
#[case("ubyte", false)]
#[case("NOT_A_TYPE", false)]
fn enum_parameter_matches_declared_literals_case_sensitively(#[case] literal: &str, #[case] should_parse: bool) {
    let source = module_body(&format!(
        "/begin MEASUREMENT meas \"\" {} CONV 0 0 0 100\n/end MEASUREMENT",
        literal
    ));
    let file = write_temp(&source);
    let result = a2lparser::parse_file(file.path(), &ParserConfig::default());
    assert_eq!(result.is_ok(), should_parse, "literal {:?}: {:?}", literal, result.err());
}

#[test]
fn repeating_trailing_parameter_stops_at_the_first_non_matching_token() {
    let source = module_body(
        "/begin VARIANT_CODING\n\
         /begin VAR_CHARACTERISTIC vc crit\n\
         /begin VAR_ADDRESS\n\
         1 2 3\n\
         /end VAR_ADDRESS\n\
         /end VAR_CHARACTERISTIC\n\
         /end VARIANT_CODING",
    );
    let file = write_temp(&source);
    let outcome = a2lparser::parse_file(file.path(), &ParserConfig::default()).unwrap();
    let addresses = outcome
        .root
        .child("Project")
        .unwrap()
        .child("Module")
        .unwrap()
        .child("VARIANT_CODING")
        .unwrap()
        .child("VAR_CHARACTERISTIC")
        .unwrap()
        .child("VAR_ADDRESS")
        .unwrap();
    assert_eq!(addresses.multiple_values.len(), 3);
    for v in &addresses.multiple_values {
        assert!(v.as_uint().is_some());
    }
}

#[test]
fn tuple_parameter_with_counter_zero_consumes_no_further_tokens() {
    let source = module_body(
        "/begin COMPU_VTAB vtab \"\" TAB_VERBATIM 0\n\
         /end COMPU_VTAB",
    );
    let file = write_temp(&source);
    let outcome = a2lparser::parse_file(file.path(), &ParserConfig::default()).unwrap();
    let vtab = outcome
        .root
        .child("Project")
        .unwrap()
        .child("Module")
        .unwrap()
        .child("CompuVtab")
        .unwrap();
    assert_eq!(vtab.parameters[3].as_uint(), Some(0));
    assert!(vtab.multiple_values.is_empty());
}

#[test]
fn tuple_parameter_with_nonzero_counter_consumes_that_many_repetitions() {
    let source = module_body(
        "/begin COMPU_VTAB vtab \"\" TAB_VERBATIM 2\n\
         1.0 \"one\"\n\
         2.0 \"two\"\n\
         /end COMPU_VTAB",
    );
    let file = write_temp(&source);
    let outcome = a2lparser::parse_file(file.path(), &ParserConfig::default()).unwrap();
    let vtab = outcome
        .root
        .child("Project")
        .unwrap()
        .child("Module")
        .unwrap()
        .child("CompuVtab")
        .unwrap();
    assert_eq!(vtab.multiple_values.len(), 4);
}

#[test]
fn minimal_nested_project_has_only_the_two_declared_string_parameters() {
    let file = write_temp("/begin PROJECT p \"\"\n/begin MODULE m \"\"\n/end MODULE\n/end PROJECT\n");
    let outcome = a2lparser::parse_file(file.path(), &ParserConfig::default()).unwrap();
    let project = outcome.root.child("Project").unwrap();
    assert_eq!(project.parameters.len(), 2);
    let module = project.child("Module").unwrap();
    assert_eq!(module.parameters.len(), 2);
}

#[test]
fn line_map_sections_are_non_overlapping_and_sorted_after_an_include() {
    let dir = tempfile::tempdir().unwrap();
    let included_path = dir.path().join("inner.a2l");
    let root_path = dir.path().join("outer.a2l");
    std::fs::write(&included_path, "/begin MODULE m \"\"\n/end MODULE\n").unwrap();
    std::fs::write(
        &root_path,
        "/begin PROJECT p \"\"\n/include \"inner.a2l\"\n/end PROJECT\n",
    )
    .unwrap();

    let pre = a2lparser::preprocessor::Preprocessor::new(&ParserConfig::default());
    let result = pre.process(&root_path).unwrap();
    let json = serde_json::to_value(&result.line_map).unwrap();
    let sections = json["sections"].as_array().unwrap();
    assert!(sections.len() >= 2);
    for pair in sections.windows(2) {
        let prev_end = pair[0]["absolute_end"].as_u64().unwrap();
        let next_start = pair[1]["absolute_start"].as_u64().unwrap();
        assert!(prev_end < next_start, "{:?} vs {:?}", pair[0], pair[1]);
    }
}
