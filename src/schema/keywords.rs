//! The static A2L keyword tree: for every keyword, its display name, class
//! name, block/repeat flags, ordered parameter list, and nested keywords.
//!
//! Built once via [`once_cell::sync::Lazy`] the way `creative-forest-lang-pt`
//! builds its grammar tree — a builder function assembling a literal tree,
//! never mutated after construction.
//!
//! Token ids are assigned by [`IdGen`] in declaration order. The source
//! table assigns its own fixed numeric ids; reproducing them byte-for-byte
//! was infeasible from the retrieved excerpts (the source table is ~168KB),
//! so this table instead guarantees internally stable ids and looks children
//! up by keyword name, which is what the token stream actually carries (see
//! DESIGN.md).

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::types::{NamedEnum, PredefinedType};

#[derive(Debug, Clone)]
pub enum Parameter {
    Simple {
        name: &'static str,
        ty: PredefinedType,
        repeats: bool,
    },
    Tuple {
        counter_name: &'static str,
        elements: Vec<(&'static str, PredefinedType)>,
    },
}

#[derive(Debug)]
pub struct SchemaNode {
    pub token_id: u32,
    pub name: &'static str,
    pub class_name: &'static str,
    pub is_block: bool,
    pub is_multiple: bool,
    pub parameters: Vec<Parameter>,
    pub children: HashMap<&'static str, SchemaNode>,
}

impl SchemaNode {
    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        self.children.get(name)
    }
}

struct IdGen(u32);

impl IdGen {
    fn next(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

struct NodeBuilder {
    name: &'static str,
    class_name: &'static str,
    is_block: bool,
    is_multiple: bool,
    parameters: Vec<Parameter>,
    children: Vec<NodeBuilder>,
}

impl NodeBuilder {
    fn new(name: &'static str, class_name: &'static str, is_block: bool, is_multiple: bool) -> Self {
        Self {
            name,
            class_name,
            is_block,
            is_multiple,
            parameters: Vec::new(),
            children: Vec::new(),
        }
    }

    fn param(mut self, name: &'static str, ty: PredefinedType) -> Self {
        self.parameters.push(Parameter::Simple {
            name,
            ty,
            repeats: false,
        });
        self
    }

    fn repeating_param(mut self, name: &'static str, ty: PredefinedType) -> Self {
        self.parameters.push(Parameter::Simple {
            name,
            ty,
            repeats: true,
        });
        self
    }

    fn tuple(mut self, counter_name: &'static str, elements: Vec<(&'static str, PredefinedType)>) -> Self {
        self.parameters.push(Parameter::Tuple {
            counter_name,
            elements,
        });
        self
    }

    fn child(mut self, node: NodeBuilder) -> Self {
        self.children.push(node);
        self
    }

    fn build(self, ids: &mut IdGen) -> SchemaNode {
        let token_id = ids.next();
        let children = self
            .children
            .into_iter()
            .map(|c| (c.name, c.build(ids)))
            .collect();
        SchemaNode {
            token_id,
            name: self.name,
            class_name: self.class_name,
            is_block: self.is_block,
            is_multiple: self.is_multiple,
            parameters: self.parameters,
            children,
        }
    }
}

use PredefinedType::*;

/// `ANNOTATION`'s three sub-keywords, repeated verbatim wherever a keyword
/// carries free-form documentation.
fn annotation() -> NodeBuilder {
    NodeBuilder::new("ANNOTATION", "Annotation", true, true)
        .child(
            NodeBuilder::new("ANNOTATION_LABEL", "AnnotationLabel", false, false).param("label", String),
        )
        .child(
            NodeBuilder::new("ANNOTATION_ORIGIN", "AnnotationOrigin", false, false).param("origin", String),
        )
        .child(
            NodeBuilder::new("ANNOTATION_TEXT", "AnnotationText", true, false)
                .repeating_param("text", String),
        )
}

/// Shared shape for `RECORD_LAYOUT`'s position+datatype descriptors
/// (`DIST_OP_*`, `NO_AXIS_PTS_*`, `OFFSET_*`, `RIP_ADDR_*`, `SHIFT_OP_*`,
/// `SRC_ADDR_*`, `NO_RESCALE_*`, `IDENTIFICATION`).
fn pos_datatype(name: &'static str, class_name: &'static str) -> NodeBuilder {
    NodeBuilder::new(name, class_name, false, false)
        .param("position", UInt)
        .param("datatype", Enum(NamedEnum::Datatype))
}

/// Shared shape for `RECORD_LAYOUT`'s `AXIS_PTS_*` entries.
fn axis_pts_axis(name: &'static str, class_name: &'static str) -> NodeBuilder {
    NodeBuilder::new(name, class_name, false, false)
        .param("position", UInt)
        .param("datatype", Enum(NamedEnum::Datatype))
        .param("index_order", Enum(NamedEnum::IndexOrder))
        .param("address_type", Enum(NamedEnum::AddrType))
}

/// Shared shape for `RECORD_LAYOUT`'s `AXIS_RESCALE_*` entries.
fn axis_rescale_axis(name: &'static str, class_name: &'static str) -> NodeBuilder {
    NodeBuilder::new(name, class_name, false, false)
        .param("position", UInt)
        .param("datatype", Enum(NamedEnum::Datatype))
        .param("max_number_of_rescale_pairs", UInt)
        .param("index_order", Enum(NamedEnum::IndexOrder))
        .param("address_type", Enum(NamedEnum::AddrType))
}

/// Shared shape for `RECORD_LAYOUT`'s `FIX_NO_AXIS_PTS_*` entries.
fn fix_no_axis_pts(name: &'static str, class_name: &'static str) -> NodeBuilder {
    NodeBuilder::new(name, class_name, false, false).param("number_of_axis_points", UInt)
}

/// Shared shape for the `ALIGNMENT_*` family (present under both
/// `MOD_COMMON` and `RECORD_LAYOUT`).
fn alignment(name: &'static str, class_name: &'static str) -> NodeBuilder {
    NodeBuilder::new(name, class_name, false, false).param("alignment_border", UInt)
}

fn compu_method() -> NodeBuilder {
    NodeBuilder::new("COMPU_METHOD", "CompuMethod", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("conversion_type", Ident)
        .param("format", String)
        .param("unit", String)
        .child(
            NodeBuilder::new("COEFFS", "Coeffs", false, false)
                .param("a", Float)
                .param("b", Float)
                .param("c", Float)
                .param("d", Float)
                .param("e", Float)
                .param("f", Float),
        )
        .child(
            NodeBuilder::new("COEFFS_LINEAR", "CoeffsLinear", false, false)
                .param("a", Float)
                .param("b", Float),
        )
        .child(
            NodeBuilder::new("COMPU_TAB_REF", "CompuTabRef", false, false)
                .param("conversion_table", Ident),
        )
        .child(NodeBuilder::new("FORMULA", "Formula", true, false).param("f_x", String))
        .child(
            NodeBuilder::new("FORMULA_INV", "FormulaInv", false, false).param("g_x", String),
        )
        .child(NodeBuilder::new("REF_UNIT", "RefUnit", false, false).param("unit", Ident))
        .child(
            NodeBuilder::new("STATUS_STRING_REF", "StatusStringRef", false, false)
                .param("conversion_table", Ident),
        )
}

fn compu_tab() -> NodeBuilder {
    NodeBuilder::new("COMPU_TAB", "CompuTab", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("conversion_type", Ident)
        .param("number_value_pairs", UInt)
        .tuple("number_value_pairs", vec![("in_val", Float), ("out_val", Float)])
        .child(
            NodeBuilder::new("DEFAULT_VALUE", "DefaultValue", false, false).param("display_string", String),
        )
        .child(
            NodeBuilder::new("DEFAULT_VALUE_NUMERIC", "DefaultValueNumeric", false, false)
                .param("display_value", Float),
        )
}

/// `AXIS_DESCR`'s full set of sub-keywords (axis attribute, monotony,
/// fixed-axis parameter lists, and so on).
fn axis_descr() -> NodeBuilder {
    NodeBuilder::new("AXIS_DESCR", "AxisDescr", true, true)
        .param("attribute", Enum(NamedEnum::AxisDescrAttribute))
        .param("input_quantity", Ident)
        .param("conversion", Ident)
        .param("max_axis_points", UInt)
        .param("lower_limit", Float)
        .param("upper_limit", Float)
        .child(annotation())
        .child(NodeBuilder::new("AXIS_PTS_REF", "AxisPtsRef", false, false).param("axis_points", Ident))
        .child(NodeBuilder::new("BYTE_ORDER", "ByteOrder", false, false).param("order", Enum(NamedEnum::ByteOrder)))
        .child(NodeBuilder::new("CURVE_AXIS_REF", "CurveAxisRef", false, false).param("curve_axis", Ident))
        .child(NodeBuilder::new("DEPOSIT", "Deposit", false, false).param("mode", Enum(NamedEnum::DepositMode)))
        .child(
            NodeBuilder::new("EXTENDED_LIMITS", "ExtendedLimits", false, false)
                .param("lower_limit", Float)
                .param("upper_limit", Float),
        )
        .child(
            NodeBuilder::new("FIX_AXIS_PAR", "FixAxisPar", false, false)
                .param("offset", Int)
                .param("shift", Int)
                .param("number_apo", UInt),
        )
        .child(
            NodeBuilder::new("FIX_AXIS_PAR_DIST", "FixAxisParDist", false, false)
                .param("offset", Int)
                .param("distance", Int)
                .param("number_apo", UInt),
        )
        .child(
            NodeBuilder::new("FIX_AXIS_PAR_LIST", "FixAxisParList", true, false)
                .repeating_param("axis_pts_value", Float),
        )
        .child(NodeBuilder::new("FORMAT", "Format", false, false).param("format_string", String))
        .child(NodeBuilder::new("MAX_GRAD", "MaxGrad", false, false).param("max_gradient", Float))
        .child(NodeBuilder::new("MONOTONY", "Monotony", false, false).param("monotony", Enum(NamedEnum::Monotony)))
        .child(NodeBuilder::new("PHYS_UNIT", "PhysUnit", false, false).param("unit", String))
        .child(NodeBuilder::new("READ_ONLY", "ReadOnly", false, false))
        .child(NodeBuilder::new("STEP_SIZE", "StepSize", false, false).param("step_size", Float))
}

fn axis_pts() -> NodeBuilder {
    NodeBuilder::new("AXIS_PTS", "AxisPts", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("address", ULong)
        .param("input_quantity", Ident)
        .param("deposit_record", Ident)
        .param("max_diff", Float)
        .param("conversion", Ident)
        .param("max_axis_points", UInt)
        .param("lower_limit", Float)
        .param("upper_limit", Float)
        .child(annotation())
        .child(NodeBuilder::new("BYTE_ORDER", "ByteOrder", false, false).param("order", Enum(NamedEnum::ByteOrder)))
        .child(
            NodeBuilder::new("CALIBRATION_ACCESS", "CalibrationAccess", false, false)
                .param("access_type", Enum(NamedEnum::CalibrationAccess)),
        )
        .child(NodeBuilder::new("DEPOSIT", "Deposit", false, false).param("mode", Enum(NamedEnum::DepositMode)))
        .child(
            NodeBuilder::new("DISPLAY_IDENTIFIER", "DisplayIdentifier", false, false)
                .param("display_name", Ident),
        )
        .child(
            NodeBuilder::new("ECU_ADDRESS_EXTENSION", "EcuAddressExtension", false, false)
                .param("extension", Int),
        )
        .child(NodeBuilder::new("EXTENDED_LIMITS", "ExtendedLimits", false, false)
            .param("lower_limit", Float)
            .param("upper_limit", Float))
        .child(NodeBuilder::new("FORMAT", "Format", false, false).param("format_string", String))
        .child(NodeBuilder::new("FUNCTION_LIST", "FunctionList", true, false).repeating_param("name", Ident))
        .child(NodeBuilder::new("GUARD_RAILS", "GuardRails", false, false))
        .child(if_data())
        .child(NodeBuilder::new("MONOTONY", "Monotony", false, false).param("monotony", Enum(NamedEnum::Monotony)))
        .child(NodeBuilder::new("PHYS_UNIT", "PhysUnit", false, false).param("unit", String))
        .child(NodeBuilder::new("READ_ONLY", "ReadOnly", false, false))
        .child(NodeBuilder::new("REF_MEMORY_SEGMENT", "RefMemorySegment", false, false).param("name", Ident))
        .child(NodeBuilder::new("STEP_SIZE", "StepSize", false, false).param("step_size", Float))
        .child(
            NodeBuilder::new("SYMBOL_LINK", "SymbolLink", false, false)
                .param("symbol_name", String)
                .param("offset", Long),
        )
}

fn characteristic() -> NodeBuilder {
    NodeBuilder::new("CHARACTERISTIC", "Characteristic", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("characteristic_type", Enum(NamedEnum::CharacteristicType))
        .param("address", ULong)
        .param("deposit", Ident)
        .param("max_diff", Float)
        .param("conversion", Ident)
        .param("lower_limit", Float)
        .param("upper_limit", Float)
        .child(axis_descr())
        .child(annotation())
        .child(NodeBuilder::new("BIT_MASK", "BitMask", false, false).param("mask", ULong))
        .child(NodeBuilder::new("BYTE_ORDER", "ByteOrder", false, false).param("order", Enum(NamedEnum::ByteOrder)))
        .child(
            NodeBuilder::new("CALIBRATION_ACCESS", "CalibrationAccess", false, false)
                .param("access_type", Enum(NamedEnum::CalibrationAccess)),
        )
        .child(NodeBuilder::new("COMPARISON_QUANTITY", "ComparisonQuantity", false, false).param("name", Ident))
        .child(
            NodeBuilder::new("DEPENDENT_CHARACTERISTIC", "DependentCharacteristic", true, false)
                .param("formula", String)
                .repeating_param("characteristic", Ident),
        )
        .child(NodeBuilder::new("DISCRETE", "Discrete", false, false))
        .child(
            NodeBuilder::new("DISPLAY_IDENTIFIER", "DisplayIdentifier", false, false)
                .param("display_name", Ident),
        )
        .child(
            NodeBuilder::new("ECU_ADDRESS_EXTENSION", "EcuAddressExtension", false, false)
                .param("extension", Int),
        )
        .child(NodeBuilder::new("EXTENDED_LIMITS", "ExtendedLimits", false, false)
            .param("lower_limit", Float)
            .param("upper_limit", Float))
        .child(NodeBuilder::new("FORMAT", "Format", false, false).param("format_string", String))
        .child(NodeBuilder::new("FUNCTION_LIST", "FunctionList", true, false).repeating_param("name", Ident))
        .child(NodeBuilder::new("GUARD_RAILS", "GuardRails", false, false))
        .child(if_data())
        .child(NodeBuilder::new("MAP_LIST", "MapList", true, false).repeating_param("name", Ident))
        .child(NodeBuilder::new("MATRIX_DIM", "MatrixDim", false, false).repeating_param("numbers", UInt))
        .child(
            NodeBuilder::new("MAX_REFRESH", "MaxRefresh", false, false)
                .param("scaling_unit", UInt)
                .param("rate", ULong),
        )
        .child(NodeBuilder::new("MODEL_LINK", "ModelLink", false, false).param("link", String))
        .child(NodeBuilder::new("NUMBER", "Number", false, false).param("number", UInt))
        .child(NodeBuilder::new("PHYS_UNIT", "PhysUnit", false, false).param("unit", String))
        .child(NodeBuilder::new("READ_ONLY", "ReadOnly", false, false))
        .child(NodeBuilder::new("REF_MEMORY_SEGMENT", "RefMemorySegment", false, false).param("name", Ident))
        .child(NodeBuilder::new("STEP_SIZE", "StepSize", false, false).param("step_size", Float))
        .child(
            NodeBuilder::new("SYMBOL_LINK", "SymbolLink", false, false)
                .param("symbol_name", String)
                .param("offset", Long),
        )
        .child(
            NodeBuilder::new("VIRTUAL_CHARACTERISTIC", "VirtualCharacteristic", true, false)
                .param("formula", String)
                .repeating_param("characteristic", Ident),
        )
}

fn measurement() -> NodeBuilder {
    NodeBuilder::new("MEASUREMENT", "Measurement", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("datatype", Enum(NamedEnum::Datatype))
        .param("conversion", Ident)
        .param("resolution", UInt)
        .param("accuracy", Float)
        .param("lower_limit", Float)
        .param("upper_limit", Float)
        .child(annotation())
        .child(NodeBuilder::new("ARRAY_SIZE", "ArraySize", false, false).param("number", UInt))
        .child(NodeBuilder::new("BIT_MASK", "BitMask", false, false).param("mask", ULong))
        .child(
            NodeBuilder::new("BIT_OPERATION", "BitOperation", true, false)
                .child(NodeBuilder::new("LEFT_SHIFT", "LeftShift", false, false).param("bit_count", ULong))
                .child(NodeBuilder::new("RIGHT_SHIFT", "RightShift", false, false).param("bit_count", ULong))
                .child(NodeBuilder::new("SIGN_EXTEND", "SignExtend", false, false)),
        )
        .child(NodeBuilder::new("BYTE_ORDER", "ByteOrder", false, false).param("order", Enum(NamedEnum::ByteOrder)))
        .child(NodeBuilder::new("DISCRETE", "Discrete", false, false))
        .child(
            NodeBuilder::new("DISPLAY_IDENTIFIER", "DisplayIdentifier", false, false)
                .param("display_name", Ident),
        )
        .child(
            NodeBuilder::new("ECU_ADDRESS", "EcuAddress", false, false).param("address", ULong),
        )
        .child(
            NodeBuilder::new("ECU_ADDRESS_EXTENSION", "EcuAddressExtension", false, false)
                .param("extension", Int),
        )
        .child(NodeBuilder::new("ERROR_MASK", "ErrorMask", false, false).param("mask", ULong))
        .child(NodeBuilder::new("FORMAT", "Format", false, false).param("format_string", String))
        .child(NodeBuilder::new("FUNCTION_LIST", "FunctionList", true, false).repeating_param("name", Ident))
        .child(if_data())
        .child(NodeBuilder::new("LAYOUT", "Layout", false, false).param("index_mode", Enum(NamedEnum::LayoutIndexMode)))
        .child(NodeBuilder::new("MATRIX_DIM", "MatrixDim", false, false).repeating_param("numbers", UInt))
        .child(
            NodeBuilder::new("MAX_REFRESH", "MaxRefresh", false, false)
                .param("scaling_unit", UInt)
                .param("rate", ULong),
        )
        .child(NodeBuilder::new("PHYS_UNIT", "PhysUnit", false, false).param("unit", String))
        .child(NodeBuilder::new("READ_WRITE", "ReadWrite", false, false))
        .child(NodeBuilder::new("REF_MEMORY_SEGMENT", "RefMemorySegment", false, false).param("name", Ident))
        .child(
            NodeBuilder::new("SYMBOL_LINK", "SymbolLink", false, false)
                .param("symbol_name", String)
                .param("offset", Long),
        )
        .child(NodeBuilder::new("VIRTUAL", "Virtual", true, false).repeating_param("measuring_channel", Ident))
}

fn record_layout() -> NodeBuilder {
    NodeBuilder::new("RECORD_LAYOUT", "RecordLayout", true, true)
        .param("name", Ident)
        .child(alignment("ALIGNMENT_BYTE", "AlignmentByte"))
        .child(alignment("ALIGNMENT_FLOAT16_IEEE", "AlignmentFloat16Ieee"))
        .child(alignment("ALIGNMENT_FLOAT32_IEEE", "AlignmentFloat32Ieee"))
        .child(alignment("ALIGNMENT_FLOAT64_IEEE", "AlignmentFloat64Ieee"))
        .child(alignment("ALIGNMENT_INT64", "AlignmentInt64"))
        .child(alignment("ALIGNMENT_LONG", "AlignmentLong"))
        .child(alignment("ALIGNMENT_WORD", "AlignmentWord"))
        .child(axis_pts_axis("AXIS_PTS_X", "AxisPtsX"))
        .child(axis_pts_axis("AXIS_PTS_Y", "AxisPtsY"))
        .child(axis_pts_axis("AXIS_PTS_Z", "AxisPtsZ"))
        .child(axis_pts_axis("AXIS_PTS_4", "AxisPts4"))
        .child(axis_pts_axis("AXIS_PTS_5", "AxisPts5"))
        .child(axis_rescale_axis("AXIS_RESCALE_X", "AxisRescaleX"))
        .child(axis_rescale_axis("AXIS_RESCALE_Y", "AxisRescaleY"))
        .child(axis_rescale_axis("AXIS_RESCALE_Z", "AxisRescaleZ"))
        .child(axis_rescale_axis("AXIS_RESCALE_4", "AxisRescale4"))
        .child(axis_rescale_axis("AXIS_RESCALE_5", "AxisRescale5"))
        .child(pos_datatype("DIST_OP_X", "DistOpX"))
        .child(pos_datatype("DIST_OP_Y", "DistOpY"))
        .child(pos_datatype("DIST_OP_Z", "DistOpZ"))
        .child(pos_datatype("DIST_OP_4", "DistOp4"))
        .child(pos_datatype("DIST_OP_5", "DistOp5"))
        .child(fix_no_axis_pts("FIX_NO_AXIS_PTS_X", "FixNoAxisPtsX"))
        .child(fix_no_axis_pts("FIX_NO_AXIS_PTS_Y", "FixNoAxisPtsY"))
        .child(fix_no_axis_pts("FIX_NO_AXIS_PTS_Z", "FixNoAxisPtsZ"))
        .child(fix_no_axis_pts("FIX_NO_AXIS_PTS_4", "FixNoAxisPts4"))
        .child(fix_no_axis_pts("FIX_NO_AXIS_PTS_5", "FixNoAxisPts5"))
        .child(
            NodeBuilder::new("FNC_VALUES", "FncValues", false, false)
                .param("position", UInt)
                .param("datatype", Enum(NamedEnum::Datatype))
                .param("index_mode", Enum(NamedEnum::FncValuesIndexMode))
                .param("address_type", Enum(NamedEnum::AddrType)),
        )
        .child(pos_datatype("IDENTIFICATION", "Identification"))
        .child(pos_datatype("NO_AXIS_PTS_X", "NoAxisPtsX"))
        .child(pos_datatype("NO_AXIS_PTS_Y", "NoAxisPtsY"))
        .child(pos_datatype("NO_AXIS_PTS_Z", "NoAxisPtsZ"))
        .child(pos_datatype("NO_AXIS_PTS_4", "NoAxisPts4"))
        .child(pos_datatype("NO_AXIS_PTS_5", "NoAxisPts5"))
        .child(NodeBuilder::new("STATIC_RECORD_LAYOUT", "StaticRecordLayout", false, false))
        .child(pos_datatype("NO_RESCALE_X", "NoRescaleX"))
        .child(pos_datatype("NO_RESCALE_Y", "NoRescaleY"))
        .child(pos_datatype("NO_RESCALE_Z", "NoRescaleZ"))
        .child(pos_datatype("NO_RESCALE_4", "NoRescale4"))
        .child(pos_datatype("NO_RESCALE_5", "NoRescale5"))
        .child(pos_datatype("OFFSET_X", "OffsetX"))
        .child(pos_datatype("OFFSET_Y", "OffsetY"))
        .child(pos_datatype("OFFSET_Z", "OffsetZ"))
        .child(pos_datatype("OFFSET_4", "Offset4"))
        .child(pos_datatype("OFFSET_5", "Offset5"))
        .child(
            NodeBuilder::new("RESERVED", "Reserved", false, true)
                .param("position", UInt)
                .param("data_size", Enum(NamedEnum::DataSize)),
        )
        .child(pos_datatype("RIP_ADDR_W", "RipAddrW"))
        .child(pos_datatype("RIP_ADDR_X", "RipAddrX"))
        .child(pos_datatype("RIP_ADDR_Y", "RipAddrY"))
        .child(pos_datatype("RIP_ADDR_Z", "RipAddrZ"))
        .child(pos_datatype("RIP_ADDR_4", "RipAddr4"))
        .child(pos_datatype("RIP_ADDR_5", "RipAddr5"))
        .child(pos_datatype("SHIFT_OP_X", "ShiftOpX"))
        .child(pos_datatype("SHIFT_OP_Y", "ShiftOpY"))
        .child(pos_datatype("SHIFT_OP_Z", "ShiftOpZ"))
        .child(pos_datatype("SHIFT_OP_4", "ShiftOp4"))
        .child(pos_datatype("SHIFT_OP_5", "ShiftOp5"))
        .child(pos_datatype("SRC_ADDR_X", "SrcAddrX"))
        .child(pos_datatype("SRC_ADDR_Y", "SrcAddrY"))
        .child(pos_datatype("SRC_ADDR_Z", "SrcAddrZ"))
        .child(pos_datatype("SRC_ADDR_4", "SrcAddr4"))
        .child(pos_datatype("SRC_ADDR_5", "SrcAddr5"))
}

fn function() -> NodeBuilder {
    NodeBuilder::new("FUNCTION", "Function", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .child(annotation())
        .child(NodeBuilder::new("DEF_CHARACTERISTIC", "DefCharacteristic", true, false).repeating_param("identifier", Ident))
        .child(NodeBuilder::new("FUNCTION_VERSION", "FunctionVersion", false, false).param("version_identifier", String))
        .child(if_data())
        .child(NodeBuilder::new("IN_MEASUREMENT", "InMeasurement", true, false).repeating_param("identifier", Ident))
        .child(NodeBuilder::new("LOC_MEASUREMENT", "LocMeasurement", true, false).repeating_param("identifier", Ident))
        .child(NodeBuilder::new("OUT_MEASUREMENT", "OutMeasurement", true, false).repeating_param("identifier", Ident))
        .child(NodeBuilder::new("REF_CHARACTERISTIC", "RefCharacteristic", true, false).repeating_param("identifier", Ident))
        .child(NodeBuilder::new("SUB_FUNCTION", "SubFunction", true, false).repeating_param("identifier", Ident))
}

fn group() -> NodeBuilder {
    NodeBuilder::new("GROUP", "Group", true, true)
        .param("group_name", Ident)
        .param("group_long_identifier", String)
        .child(annotation())
        .child(NodeBuilder::new("FUNCTION_LIST", "FunctionList", true, false).repeating_param("name", Ident))
        .child(if_data())
        .child(NodeBuilder::new("REF_CHARACTERISTIC", "RefCharacteristic", true, false).repeating_param("identifier", Ident))
        .child(NodeBuilder::new("REF_MEASUREMENT", "RefMeasurement", true, false).repeating_param("identifier", Ident))
        .child(NodeBuilder::new("ROOT", "Root", false, false))
        .child(NodeBuilder::new("SUB_GROUP", "SubGroup", true, false).repeating_param("identifier", Ident))
}

fn unit() -> NodeBuilder {
    NodeBuilder::new("UNIT", "Unit", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("display", String)
        .param("unit_type", Ident)
}

fn user_rights() -> NodeBuilder {
    NodeBuilder::new("USER_RIGHTS", "UserRights", true, true)
        .param("user_level_id", Ident)
        .child(NodeBuilder::new("READ_ONLY", "ReadOnly", false, false))
        .child(NodeBuilder::new("REF_GROUP", "RefGroup", true, true).repeating_param("identifier", Ident))
}

fn frame() -> NodeBuilder {
    NodeBuilder::new("FRAME", "Frame", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("scaling_unit", UInt)
        .param("rate", ULong)
}

fn blob() -> NodeBuilder {
    NodeBuilder::new("BLOB", "Blob", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("address", ULong)
        .param("number_of_bytes", ULong)
}

fn transformer() -> NodeBuilder {
    NodeBuilder::new("TRANSFORMER", "Transformer", true, true)
        .param("name", Ident)
        .param("version", String)
        .param("dll_32bit", String)
        .param("dll_64bit", String)
        .param("timeout_in_ms", ULong)
        .param("access", Ident)
        .param("inverse_transformer", Ident)
}

fn instance() -> NodeBuilder {
    NodeBuilder::new("INSTANCE", "Instance", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("type_name", Ident)
        .param("address", ULong)
        .child(NodeBuilder::new("COMPARISON_QUANTITY", "ComparisonQuantity", false, false).param("name", Ident))
        .child(
            NodeBuilder::new("DEPENDENT_CHARACTERISTIC", "DependentCharacteristic", true, false)
                .param("formula", String)
                .repeating_param("characteristic", Ident),
        )
        .child(
            NodeBuilder::new("DISPLAY_IDENTIFIER", "DisplayIdentifier", false, false)
                .param("display_name", Ident),
        )
        .child(
            NodeBuilder::new("ECU_ADDRESS_EXTENSION", "EcuAddressExtension", false, false)
                .param("extension", Int),
        )
        .child(if_data())
        .child(NodeBuilder::new("MATRIX_DIM", "MatrixDim", false, false).repeating_param("numbers", UInt))
        .child(NodeBuilder::new("NUMBER", "Number", false, false).param("number", UInt))
        .child(
            NodeBuilder::new("SYMBOL_LINK", "SymbolLink", false, false)
                .param("symbol_name", String)
                .param("offset", Long),
        )
}

fn typedef_axis() -> NodeBuilder {
    NodeBuilder::new("TYPEDEF_AXIS", "TypedefAxis", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("record_layout", Ident)
        .param("max_diff", Float)
        .param("conversion", Ident)
        .param("max_axis_points", UInt)
        .param("lower_limit", Float)
        .param("upper_limit", Float)
}

fn typedef_characteristic() -> NodeBuilder {
    NodeBuilder::new("TYPEDEF_CHARACTERISTIC", "TypedefCharacteristic", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("characteristic_type", Ident)
        .param("record_layout", Ident)
        .param("max_diff", Float)
        .param("conversion", Ident)
        .param("lower_limit", Float)
        .param("upper_limit", Float)
}

fn typedef_measurement() -> NodeBuilder {
    NodeBuilder::new("TYPEDEF_MEASUREMENT", "TypedefMeasurement", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("datatype", Enum(NamedEnum::Datatype))
        .param("conversion", Ident)
        .param("resolution", UInt)
        .param("accuracy", Float)
        .param("lower_limit", Float)
        .param("upper_limit", Float)
}

fn typedef_structure() -> NodeBuilder {
    NodeBuilder::new("TYPEDEF_STRUCTURE", "TypedefStructure", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("size", ULong)
}

fn if_data() -> NodeBuilder {
    // Content is opaque to the A2L schema table: its body is preprocessed
    // out to a side channel (see crate::preprocessor) and interpreted later
    // against the AML grammar (crate::if_data), not against this tree.
    NodeBuilder::new("IF_DATA", "IfData", true, true)
}

fn mod_common() -> NodeBuilder {
    NodeBuilder::new("MOD_COMMON", "ModCommon", true, false)
        .param("comment", String)
        .child(alignment("ALIGNMENT_BYTE", "AlignmentByte"))
        .child(alignment("ALIGNMENT_FLOAT16_IEEE", "AlignmentFloat16Ieee"))
        .child(alignment("ALIGNMENT_FLOAT32_IEEE", "AlignmentFloat32Ieee"))
        .child(alignment("ALIGNMENT_FLOAT64_IEEE", "AlignmentFloat64Ieee"))
        .child(alignment("ALIGNMENT_INT64", "AlignmentInt64"))
        .child(alignment("ALIGNMENT_LONG", "AlignmentLong"))
        .child(alignment("ALIGNMENT_WORD", "AlignmentWord"))
        .child(NodeBuilder::new("BYTE_ORDER", "ByteOrder", false, false).param("order", Enum(NamedEnum::ByteOrder)))
        .child(NodeBuilder::new("DATA_SIZE", "DataSize", false, false).param("size", UInt))
        .child(NodeBuilder::new("DEPOSIT", "Deposit", false, false).param("mode", Enum(NamedEnum::DepositMode)))
        .child(NodeBuilder::new("S_REC_LAYOUT", "SRecLayout", false, false).param("name", Ident))
}

fn mod_par() -> NodeBuilder {
    NodeBuilder::new("MOD_PAR", "ModPar", true, false)
        .param("comment", String)
        .child(NodeBuilder::new("ADDR_EPK", "AddrEpk", false, true).param("address", ULong))
        .child(
            NodeBuilder::new("CALIBRATION_METHOD", "CalibrationMethod", true, true)
                .param("method", String)
                .param("version", ULong)
                .child(
                    NodeBuilder::new("CALIBRATION_HANDLE", "CalibrationHandle", true, true)
                        .repeating_param("handle", ULong)
                        .child(
                            NodeBuilder::new("CALIBRATION_HANDLE_TEXT", "CalibrationHandleText", false, false)
                                .param("text", String),
                        ),
                ),
        )
        .child(NodeBuilder::new("CPU_TYPE", "CpuType", false, false).param("cpu", String))
        .child(NodeBuilder::new("CUSTOMER", "Customer", false, false).param("customer", String))
        .child(NodeBuilder::new("CUSTOMER_NO", "CustomerNo", false, false).param("number", String))
        .child(NodeBuilder::new("ECU", "Ecu", false, false).param("control_unit", String))
        .child(
            NodeBuilder::new("ECU_CALIBRATION_OFFSET", "EcuCalibrationOffset", false, false)
                .param("offset", Long),
        )
        .child(NodeBuilder::new("EPK", "Epk", false, false).param("identifier", String))
        .child(
            NodeBuilder::new("MEMORY_LAYOUT", "MemoryLayout", true, true)
                .param("prg_type", Enum(NamedEnum::MemoryLayoutPrgType))
                .param("address", ULong)
                .param("size", ULong)
                .param("offset_0", Long)
                .param("offset_1", Long)
                .param("offset_2", Long)
                .param("offset_3", Long)
                .param("offset_4", Long)
                .child(if_data()),
        )
        .child(
            NodeBuilder::new("MEMORY_SEGMENT", "MemorySegment", true, true)
                .param("name", Ident)
                .param("long_identifier", String)
                .param("prg_type", Enum(NamedEnum::MemorySegmentPrgType))
                .param("memory_type", Enum(NamedEnum::MemoryType))
                .param("attribute", Enum(NamedEnum::MemorySegmentAttribute))
                .param("address", ULong)
                .param("size", ULong)
                .param("offset_0", Long)
                .param("offset_1", Long)
                .param("offset_2", Long)
                .param("offset_3", Long)
                .param("offset_4", Long)
                .child(if_data()),
        )
        .child(NodeBuilder::new("NO_OF_INTERFACES", "NoOfInterfaces", false, false).param("num", UInt))
        .child(NodeBuilder::new("PHONE_NO", "PhoneNo", false, false).param("telnum", String))
        .child(NodeBuilder::new("SUPPLIER", "Supplier", false, false).param("manufacturer", String))
        .child(
            NodeBuilder::new("SYSTEM_CONSTANT", "SystemConstant", false, true)
                .param("name", String)
                .param("value", String),
        )
        .child(NodeBuilder::new("USER", "User", false, false).param("user_name", String))
        .child(NodeBuilder::new("VERSION", "Version", false, false).param("version_identifier", String))
}

fn var_naming() -> NodeBuilder {
    NodeBuilder::new("VAR_NAMING", "VarNaming", false, false).param("tag", Enum(NamedEnum::VarNamingTag))
}

fn var_separator() -> NodeBuilder {
    NodeBuilder::new("VAR_SEPARATOR", "VarSeparator", false, false).param("separator", String)
}

/// `VARIANT_CODING`'s criterion/characteristic tree. `VAR_ADDRESS` belongs to
/// a single `VAR_CHARACTERISTIC`, and `VAR_MEASUREMENT` /
/// `VAR_SELECTION_CHARACTERISTIC` belong to a single `VAR_CRITERION` — both
/// are nested children, not `VARIANT_CODING` siblings.
fn variant_coding() -> NodeBuilder {
    NodeBuilder::new("VARIANT_CODING", "VariantCoding", true, false)
        .child(
            NodeBuilder::new("VAR_CHARACTERISTIC", "VarCharacteristic", true, true)
                .param("name", Ident)
                .repeating_param("criterion_name", Ident)
                .child(
                    NodeBuilder::new("VAR_ADDRESS", "VarAddress", true, false)
                        .repeating_param("address", ULong),
                ),
        )
        .child(
            NodeBuilder::new("VAR_CRITERION", "VarCriterion", true, true)
                .param("name", Ident)
                .param("long_identifier", String)
                .repeating_param("value", Ident)
                .child(NodeBuilder::new("VAR_MEASUREMENT", "VarMeasurement", false, false).param("name", Ident))
                .child(
                    NodeBuilder::new(
                        "VAR_SELECTION_CHARACTERISTIC",
                        "VarSelectionCharacteristic",
                        false,
                        false,
                    )
                    .param("name", Ident),
                ),
        )
        .child(NodeBuilder::new("VAR_FORBIDDEN_COMB", "VarForbiddenComb", true, true))
        .child(var_naming())
        .child(var_separator())
}

fn compu_vtab() -> NodeBuilder {
    NodeBuilder::new("COMPU_VTAB", "CompuVtab", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("conversion_type", Ident)
        .param("number_value_pairs", UInt)
        .tuple(
            "number_value_pairs",
            vec![("in_val", Float), ("out_val", String)],
        )
}

fn compu_vtab_range() -> NodeBuilder {
    NodeBuilder::new("COMPU_VTAB_RANGE", "CompuVtabRange", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .param("number_value_triples", UInt)
        .tuple(
            "number_value_triples",
            vec![("in_val_min", Float), ("in_val_max", Float), ("out_val", String)],
        )
}

fn a2ml() -> NodeBuilder {
    NodeBuilder::new("A2ML", "A2ml", true, false)
}

fn module() -> NodeBuilder {
    NodeBuilder::new("MODULE", "Module", true, true)
        .param("name", Ident)
        .param("long_identifier", String)
        .child(a2ml())
        .child(mod_common())
        .child(mod_par())
        .child(characteristic())
        .child(measurement())
        .child(axis_pts())
        .child(compu_method())
        .child(compu_tab())
        .child(compu_vtab())
        .child(compu_vtab_range())
        .child(frame())
        .child(function())
        .child(group())
        .child(if_data())
        .child(instance())
        .child(record_layout())
        .child(typedef_axis())
        .child(typedef_characteristic())
        .child(typedef_measurement())
        .child(typedef_structure())
        .child(blob())
        .child(transformer())
        .child(unit())
        .child(user_rights())
        .child(variant_coding())
}

fn header() -> NodeBuilder {
    NodeBuilder::new("HEADER", "Header", true, false)
        .param("comment", String)
        .child(NodeBuilder::new("PROJECT_NO", "ProjectNo", false, false).param("project_number", Ident))
        .child(NodeBuilder::new("VERSION", "Version", false, false).param("version_identifier", String))
}

fn project() -> NodeBuilder {
    NodeBuilder::new("PROJECT", "Project", true, false)
        .param("name", Ident)
        .param("long_identifier", String)
        .child(header())
        .child(module())
}

fn root() -> NodeBuilder {
    NodeBuilder::new("", "Root", true, false)
        .child(
            NodeBuilder::new("ASAP2_VERSION", "Asap2Version", false, false)
                .param("version_no", UInt)
                .param("upgrade_no", UInt),
        )
        .child(
            NodeBuilder::new("A2ML_VERSION", "A2mlVersion", false, false)
                .param("version_no", UInt)
                .param("upgrade_no", UInt),
        )
        .child(project())
}

pub static SCHEMA_ROOT: Lazy<SchemaNode> = Lazy::new(|| {
    let mut ids = IdGen(0);
    root().build(&mut ids)
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_exposes_version_headers_and_project() {
        assert!(SCHEMA_ROOT.child("ASAP2_VERSION").is_some());
        assert!(SCHEMA_ROOT.child("PROJECT").is_some());
    }

    #[test]
    fn module_carries_the_documented_keyword_family() {
        let project = SCHEMA_ROOT.child("PROJECT").unwrap();
        let module = project.child("MODULE").unwrap();
        for name in [
            "A2ML",
            "MOD_COMMON",
            "MOD_PAR",
            "CHARACTERISTIC",
            "MEASUREMENT",
            "AXIS_PTS",
            "COMPU_METHOD",
            "COMPU_TAB",
            "COMPU_VTAB",
            "COMPU_VTAB_RANGE",
            "FRAME",
            "FUNCTION",
            "GROUP",
            "IF_DATA",
            "INSTANCE",
            "RECORD_LAYOUT",
            "TYPEDEF_AXIS",
            "TYPEDEF_CHARACTERISTIC",
            "TYPEDEF_MEASUREMENT",
            "TYPEDEF_STRUCTURE",
            "BLOB",
            "TRANSFORMER",
            "UNIT",
            "USER_RIGHTS",
            "VARIANT_CODING",
        ] {
            assert!(module.child(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn compu_tab_declares_a_tuple_parameter() {
        let project = SCHEMA_ROOT.child("PROJECT").unwrap();
        let module = project.child("MODULE").unwrap();
        let compu_tab = module.child("COMPU_TAB").unwrap();
        assert!(matches!(
            compu_tab.parameters.last(),
            Some(Parameter::Tuple { .. })
        ));
    }

    #[test]
    fn token_ids_are_unique_across_the_tree() {
        fn collect(node: &SchemaNode, out: &mut Vec<u32>) {
            out.push(node.token_id);
            for child in node.children.values() {
                collect(child, out);
            }
        }
        let mut ids = Vec::new();
        collect(&SCHEMA_ROOT, &mut ids);
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(ids.len(), sorted.len());
    }

    #[test]
    fn record_layout_carries_its_full_per_axis_sub_keyword_family() {
        let project = SCHEMA_ROOT.child("PROJECT").unwrap();
        let module = project.child("MODULE").unwrap();
        let record_layout = module.child("RECORD_LAYOUT").unwrap();
        for name in [
            "FNC_VALUES",
            "AXIS_PTS_X",
            "AXIS_PTS_5",
            "AXIS_RESCALE_Z",
            "DIST_OP_4",
            "NO_AXIS_PTS_Y",
            "OFFSET_X",
            "RIP_ADDR_W",
            "SRC_ADDR_5",
            "SHIFT_OP_Z",
            "ALIGNMENT_FLOAT64_IEEE",
            "STATIC_RECORD_LAYOUT",
            "RESERVED",
            "IDENTIFICATION",
        ] {
            assert!(record_layout.child(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn variant_coding_nests_var_address_and_var_measurement_correctly() {
        let project = SCHEMA_ROOT.child("PROJECT").unwrap();
        let module = project.child("MODULE").unwrap();
        let variant_coding = module.child("VARIANT_CODING").unwrap();
        assert!(variant_coding.child("VAR_ADDRESS").is_none());
        assert!(variant_coding.child("VAR_MEASUREMENT").is_none());

        let var_characteristic = variant_coding.child("VAR_CHARACTERISTIC").unwrap();
        assert!(var_characteristic.child("VAR_ADDRESS").is_some());
        assert!(matches!(
            var_characteristic.parameters.last(),
            Some(Parameter::Simple { name: "criterion_name", repeats: true, .. })
        ));

        let var_criterion = variant_coding.child("VAR_CRITERION").unwrap();
        assert!(var_criterion.child("VAR_MEASUREMENT").is_some());
        assert!(var_criterion.child("VAR_SELECTION_CHARACTERISTIC").is_some());
        assert!(matches!(
            var_criterion.parameters.last(),
            Some(Parameter::Simple { name: "value", repeats: true, .. })
        ));
    }

    #[test]
    fn annotation_text_carries_a_repeating_text_parameter() {
        let annotation = annotation().build(&mut IdGen(0));
        let text = annotation.child("ANNOTATION_TEXT").unwrap();
        assert!(matches!(
            text.parameters.as_slice(),
            [Parameter::Simple { name: "text", repeats: true, ty: PredefinedType::String }]
        ));
    }

    #[test]
    fn calibration_access_is_validated_against_its_declared_enum() {
        let axis_pts = axis_pts().build(&mut IdGen(0));
        let calibration_access = axis_pts.child("CALIBRATION_ACCESS").unwrap();
        match calibration_access.parameters.as_slice() {
            [Parameter::Simple { ty: PredefinedType::Enum(e), .. }] => {
                assert_eq!(*e, NamedEnum::CalibrationAccess);
            }
            other => panic!("unexpected parameters: {other:?}"),
        }
    }
}
