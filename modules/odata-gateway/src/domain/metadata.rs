//! `$metadata` EDMX document.

use odata_batch::normalize_key;

use super::model::EntitySetName;
use crate::config::MetadataConfig;

const EDMX_NS: &str = "http://schemas.microsoft.com/ado/2007/06/edmx";
const EDM_NS: &str = "http://schemas.microsoft.com/ado/2008/09/edm";

/// Render the EDMX (v1.0) document for `entity_set`.
///
/// Property and key names go through [`normalize_key`] so they match the keys
/// emitted by the data endpoints.
#[must_use]
pub fn render_edmx(entity_set: &EntitySetName, cfg: &MetadataConfig) -> String {
    let name = escape(entity_set.as_str());
    let key = escape(&normalize_key(&cfg.key_property));
    let namespace = format!("{name}{}", escape(&cfg.namespace_suffix));

    let mut lines = Vec::with_capacity(cfg.properties.len() + 14);
    lines.push(r#"<?xml version="1.0" encoding="utf-8"?>"#.to_owned());
    lines.push(format!(r#"<edmx:Edmx xmlns:edmx="{EDMX_NS}" Version="1.0">"#));
    lines.push("  <edmx:DataServices>".to_owned());
    lines.push(format!(
        r#"    <Schema xmlns="{EDM_NS}" Namespace="{namespace}">"#
    ));
    lines.push(format!(r#"      <EntityType Name="{name}">"#));
    lines.push(format!(r#"        <Key><PropertyRef Name="{key}" /></Key>"#));

    lines.extend(cfg.properties.iter().map(|prop| {
        let prop_name = escape(&normalize_key(&prop.name));
        let nullable = if prop.nullable {
            ""
        } else {
            r#" Nullable="false""#
        };
        format!(
            r#"        <Property Name="{prop_name}" Type="{}"{nullable} />"#,
            prop.edm_type.as_str()
        )
    }));

    lines.push("      </EntityType>".to_owned());
    lines.push(format!(r#"      <EntityContainer Name="{name}Container">"#));
    lines.push(format!(
        r#"        <EntitySet Name="{name}" EntityType="{namespace}.{name}" />"#
    ));
    lines.push("      </EntityContainer>".to_owned());
    lines.push("    </Schema>".to_owned());
    lines.push("  </edmx:DataServices>".to_owned());
    lines.push("</edmx:Edmx>".to_owned());
    lines.join("\n")
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::{EdmType, PropertyConfig};

    fn flights() -> EntitySetName {
        EntitySetName::parse("Flights").unwrap()
    }

    #[test]
    fn default_schema_document() {
        let xml = render_edmx(&flights(), &MetadataConfig::default());

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<edmx:Edmx"));
        assert!(xml.ends_with("</edmx:Edmx>"));
        assert!(xml.contains(r#"Namespace="Flights_schema""#));
        assert!(xml.contains(r#"<EntityType Name="Flights">"#));
        assert!(xml.contains(r#"<Key><PropertyRef Name="Year" /></Key>"#));
        assert!(xml.contains(r#"<Property Name="Year" Type="Edm.Int64" Nullable="false" />"#));
        assert!(xml.contains(r#"<Property Name="Diverted" Type="Edm.Boolean" />"#));
        assert!(xml.contains(r#"<Property Name="LateAircraftDelay" Type="Edm.String" />"#));
        assert!(xml.contains(r#"<EntityContainer Name="FlightsContainer">"#));
        assert!(xml.contains(r#"<EntitySet Name="Flights" EntityType="Flights_schema.Flights" />"#));
        assert_eq!(xml.matches("<Property ").count(), 29);
    }

    #[test]
    fn property_names_follow_row_casing() {
        let cfg = MetadataConfig {
            namespace_suffix: "Model".to_owned(),
            key_property: "id".to_owned(),
            properties: vec![
                PropertyConfig {
                    name: "id".to_owned(),
                    edm_type: EdmType::Int64,
                    nullable: false,
                },
                PropertyConfig {
                    name: "arrDelay".to_owned(),
                    edm_type: EdmType::Double,
                    nullable: true,
                },
            ],
        };
        let xml = render_edmx(&flights(), &cfg);

        assert!(xml.contains(r#"Namespace="FlightsModel""#));
        assert!(xml.contains(r#"EntityType="FlightsModel.Flights""#));
        assert!(xml.contains(r#"<PropertyRef Name="Id" />"#));
        assert!(xml.contains(r#"<Property Name="ArrDelay" Type="Edm.Double" />"#));
    }

    #[test]
    fn names_are_escaped() {
        let set = EntitySetName::parse("A&B<\"x\">").unwrap();
        let xml = render_edmx(&set, &MetadataConfig::default());
        assert!(xml.contains(r#"<EntityType Name="A&amp;B&lt;&quot;x&quot;&gt;">"#));
        assert!(!xml.contains("A&B"));
    }
}
