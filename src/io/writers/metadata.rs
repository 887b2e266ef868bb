use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::{Error, Result};
use crate::io::job::LookupTable;

/// Metadata items embedded in a single-band output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandMetadata {
    /// Dataset-level items, written in order
    pub items: Vec<(String, String)>,
    pub band_description: Option<String>,
}

impl BandMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn item(mut self, key: &str, value: impl Into<String>) -> Self {
        self.items.push((key.to_string(), value.into()));
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.band_description = Some(description.to_string());
        self
    }

    pub fn lookup_table(self, lut: &LookupTable) -> Result<Self> {
        Ok(self.item("LOOKUP_TABLE", serde_json::to_string(lut)?))
    }

    /// Render as the XML document GDAL stores in the `GDAL_METADATA` TIFF tag.
    pub fn to_gdal_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Start(BytesStart::new("GDALMetadata")))?;

        for (key, value) in &self.items {
            let mut item = BytesStart::new("Item");
            item.push_attribute(("name", key.as_str()));
            writer.write_event(Event::Start(item))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new("Item")))?;
        }

        if let Some(desc) = &self.band_description {
            let mut item = BytesStart::new("Item");
            item.push_attribute(("name", "DESCRIPTION"));
            item.push_attribute(("sample", "0"));
            item.push_attribute(("role", "description"));
            writer.write_event(Event::Start(item))?;
            writer.write_event(Event::Text(BytesText::new(desc)))?;
            writer.write_event(Event::End(BytesEnd::new("Item")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("GDALMetadata")))?;
        String::from_utf8(writer.into_inner().into_inner()).map_err(Error::external)
    }
}
