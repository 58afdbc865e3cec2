//! Record Projector
//!
//! Flattens `TermntdRcrd` elements of a namespace-stripped DLTINS document
//! into six-column rows.

use crate::xml::Element;
use serde::Serialize;

/// Element name of one termination record
pub const RECORD_TAG: &str = "TermntdRcrd";

/// Element grouping the general instrument attributes
pub const GENERAL_ATTRIBUTES_TAG: &str = "FinInstrmGnlAttrbts";

/// Issuer element, a direct child of the record
pub const ISSUER_TAG: &str = "Issr";

/// Output column names, in order
pub const COLUMNS: [&str; 6] = [
    "FinInstrmGnlAttrbts.Id",
    "FinInstrmGnlAttrbts.FullNm",
    "FinInstrmGnlAttrbts.ClssfctnTp",
    "FinInstrmGnlAttrbts.CmmdtyDerivInd",
    "FinInstrmGnlAttrbts.NtnlCcy",
    "Issr",
];

/// One output row; `None` marks an absent element or an element without text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    #[serde(rename = "FinInstrmGnlAttrbts.Id")]
    pub id: Option<String>,
    #[serde(rename = "FinInstrmGnlAttrbts.FullNm")]
    pub full_name: Option<String>,
    #[serde(rename = "FinInstrmGnlAttrbts.ClssfctnTp")]
    pub classification_type: Option<String>,
    #[serde(rename = "FinInstrmGnlAttrbts.CmmdtyDerivInd")]
    pub commodity_derivative_indicator: Option<String>,
    #[serde(rename = "FinInstrmGnlAttrbts.NtnlCcy")]
    pub notional_currency: Option<String>,
    #[serde(rename = "Issr")]
    pub issuer: Option<String>,
}

/// Project a single record element
pub fn project_record(record: &Element) -> Row {
    let text_of = |parent: &Element, tag: &str| parent.child_text(tag).map(str::to_string);

    let mut row = Row {
        issuer: text_of(record, ISSUER_TAG),
        ..Row::default()
    };

    if let Some(general) = record.find(GENERAL_ATTRIBUTES_TAG) {
        row.id = text_of(general, "Id");
        row.full_name = text_of(general, "FullNm");
        row.classification_type = text_of(general, "ClssfctnTp");
        row.commodity_derivative_indicator = text_of(general, "CmmdtyDerivInd");
        row.notional_currency = text_of(general, "NtnlCcy");
    }

    row
}

/// Rows for every termination record under `root`, in document order
pub fn project_records(root: &Element) -> impl Iterator<Item = Row> + '_ {
    root.iter(RECORD_TAG).map(project_record)
}
