//! Tracked annex identifiers
//!
//! The COSING regulation publishes its annexes as spreadsheets. Each annex is
//! tracked independently: it has its own index page, its own local file and
//! its own entry in the state file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the fixed set of regulatory annexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Annex {
    I,
    II,
    III,
    IV,
    V,
    VI,
}

impl Annex {
    /// Every tracked annex, in publication order
    pub const ALL: [Annex; 6] = [
        Annex::I,
        Annex::II,
        Annex::III,
        Annex::IV,
        Annex::V,
        Annex::VI,
    ];

    /// Roman-numeral identifier, also used as the state key
    pub fn id(&self) -> &'static str {
        match self {
            Annex::I => "I",
            Annex::II => "II",
            Annex::III => "III",
            Annex::IV => "IV",
            Annex::V => "V",
            Annex::VI => "VI",
        }
    }

    /// Expand an index-page URL template (`{annex}` placeholder)
    pub fn index_url(&self, template: &str) -> String {
        template.replace("{annex}", self.id())
    }

    /// Local file name for this annex with the given spreadsheet extension
    pub fn file_name(&self, extension: &str) -> String {
        format!("COSING_Annex_{}_v2.{}", self.id(), extension)
    }
}

impl fmt::Display for Annex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
