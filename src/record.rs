use std::path::Path;

use serde::Serialize;

use crate::response::Extraction;

// Batch-constant catalogue values. Every record in a run carries these.
const DEPARTMENT: &str = "Special Collections - Archive Collections";
const OBJECT_TYPE: &str = "Photograph";
const RECORD_LEVEL: &str = "Item";
const LEVEL_ATTRIBUTE: &str = "Item";
const OBJECT_STATUS: &str = "1- Available";
const RECORD_STATUS: &str = "Catalogued";
const MEDIA: &str = "slides (photographs)";
const FORMAT: &str = "positives (photographs)";

const UNIT_ID_PREFIX: &str = "ms";

/// One output row in the batch report, using EMu/EAD catalogue field names.
///
/// Every fixed field is always serialized (empty string when unknown), so
/// consumers only ever check for emptiness, never for key presence. The
/// `error`/`parse_error` fields are the only optional keys.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogueRecord {
    #[serde(rename = "ColDepartment")]
    pub col_department: String,
    #[serde(rename = "PhoPhotoCollectionRef.irn")]
    pub pho_photo_collection_ref_irn: String,
    #[serde(rename = "EADRepositoryRef.irn")]
    pub ead_repository_ref_irn: String,
    #[serde(rename = "ColObjectType")]
    pub col_object_type: String,
    #[serde(rename = "PhoRecordLevel")]
    pub pho_record_level: String,
    #[serde(rename = "EADLevelAttribute")]
    pub ead_level_attribute: String,
    #[serde(rename = "ColObjectStatus")]
    pub col_object_status: String,
    #[serde(rename = "PhoRecordStatus")]
    pub pho_record_status: String,
    #[serde(rename = "EADUnitTitle")]
    pub ead_unit_title: String,
    #[serde(rename = "EADUnitID")]
    pub ead_unit_id: String,
    #[serde(rename = "EADIdentifier")]
    pub ead_identifier: String,
    #[serde(rename = "ColParentRecordRef.irn")]
    pub col_parent_record_ref_irn: String,
    #[serde(rename = "EADScopeAndContent")]
    pub ead_scope_and_content: String,
    #[serde(rename = "EADExtent_tab")]
    pub ead_extent_tab: String,
    #[serde(rename = "EADUnitDate")]
    pub ead_unit_date: String,
    #[serde(rename = "EADUnitDateEarliest")]
    pub ead_unit_date_earliest: String,
    #[serde(rename = "EADUnitDateLatest")]
    pub ead_unit_date_latest: String,
    #[serde(rename = "EADOriginationRef_tab.irn")]
    pub ead_origination_ref_tab_irn: String,
    #[serde(rename = "EADPhysicalTechnical")]
    pub ead_physical_technical: String,
    #[serde(rename = "LocCurrentLocationRef.irn")]
    pub loc_current_location_ref_irn: String,
    #[serde(rename = "AdmPublishWebNoPassword")]
    pub adm_publish_web_no_password: String,
    #[serde(rename = "PhoMedia_tab")]
    pub pho_media_tab: String,
    #[serde(rename = "PhoFormat_tab")]
    pub pho_format_tab: String,

    pub filename: String,
    pub path: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

/// Derive the MS collection number from a filename:
/// "ms39080-51-5-1-1.jpeg" -> "ms39080". Filenames not starting with
/// the "ms" prefix yield an empty identifier.
pub fn unit_id_from_filename(filename: &str) -> &str {
    if filename.starts_with(UNIT_ID_PREFIX) {
        filename.split('-').next().unwrap_or("")
    } else {
        ""
    }
}

/// Build the full catalogue record for one image. This is the only place a
/// record is assembled, for both the success and error paths, so the field
/// set cannot drift between them.
pub fn build_record(path: &Path, extraction: &Extraction) -> CatalogueRecord {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let unit_id = unit_id_from_filename(&filename).to_string();
    let status = if extraction.error.is_some() {
        "error"
    } else {
        "success"
    };

    CatalogueRecord {
        col_department: DEPARTMENT.to_string(),
        col_object_type: OBJECT_TYPE.to_string(),
        pho_record_level: RECORD_LEVEL.to_string(),
        ead_level_attribute: LEVEL_ATTRIBUTE.to_string(),
        col_object_status: OBJECT_STATUS.to_string(),
        pho_record_status: RECORD_STATUS.to_string(),
        ead_unit_id: unit_id.clone(),
        ead_identifier: unit_id,
        pho_media_tab: MEDIA.to_string(),
        pho_format_tab: FORMAT.to_string(),
        ead_unit_title: extraction.title.clone(),
        ead_scope_and_content: extraction.description.clone(),
        ead_unit_date: extraction.date.clone(),
        filename,
        path: path.display().to_string(),
        status: status.to_string(),
        error: extraction.error.clone(),
        parse_error: extraction.parse_error.clone(),
        ..CatalogueRecord::default()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    /// The fixed schema keys plus filename/path/status.
    const EXPECTED_KEYS: usize = 26;

    #[test]
    fn empty_record_serializes_every_fixed_field() {
        let value = serde_json::to_value(CatalogueRecord::default()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), EXPECTED_KEYS);
        for key in [
            "ColDepartment",
            "PhoPhotoCollectionRef.irn",
            "EADUnitTitle",
            "EADScopeAndContent",
            "EADUnitDate",
            "PhoFormat_tab",
            "filename",
            "path",
            "status",
        ] {
            assert!(obj.contains_key(key), "missing key {key}");
        }
        // Optional error fields are omitted, not null
        assert!(!obj.contains_key("error"));
        assert!(!obj.contains_key("parse_error"));
    }

    #[test]
    fn unit_id_derived_from_ms_filenames() {
        assert_eq!(unit_id_from_filename("ms39080-51-5-1-1.jpeg"), "ms39080");
        assert_eq!(unit_id_from_filename("ms102-3.png"), "ms102");
        assert_eq!(unit_id_from_filename("slide-001.jpg"), "");
        assert_eq!(unit_id_from_filename("IMG_0001.jpeg"), "");
        assert_eq!(unit_id_from_filename(""), "");
    }

    #[test]
    fn successful_extraction_builds_full_record() {
        let extraction = Extraction {
            title: "ms39080/51".into(),
            description: "A harbour at dusk.".into(),
            date: "1957".into(),
            error: None,
            parse_error: None,
        };
        let record = build_record(Path::new("images/slides/ms39080-51-5-1-1.jpeg"), &extraction);

        assert_eq!(record.status, "success");
        assert_eq!(record.filename, "ms39080-51-5-1-1.jpeg");
        assert_eq!(record.path, "images/slides/ms39080-51-5-1-1.jpeg");
        assert_eq!(record.ead_unit_id, "ms39080");
        assert_eq!(record.ead_identifier, "ms39080");
        assert_eq!(record.ead_unit_title, "ms39080/51");
        assert_eq!(record.ead_scope_and_content, "A harbour at dusk.");
        assert_eq!(record.ead_unit_date, "1957");
        assert_eq!(record.col_department, DEPARTMENT);
        assert_eq!(record.pho_media_tab, MEDIA);
        assert!(record.error.is_none());
    }

    #[test]
    fn failed_extraction_still_carries_statics_and_unit_id() {
        let extraction = Extraction::failed("connection reset");
        let record = build_record(Path::new("ms200-1.jpg"), &extraction);

        assert_eq!(record.status, "error");
        assert_eq!(record.error.as_deref(), Some("connection reset"));
        assert_eq!(record.ead_unit_id, "ms200");
        assert_eq!(record.col_object_type, OBJECT_TYPE);
        assert_eq!(record.pho_record_status, RECORD_STATUS);
        assert!(record.ead_unit_title.is_empty());

        // Error records serialize the same fixed key set plus "error"
        let obj = serde_json::to_value(&record).unwrap();
        assert_eq!(obj.as_object().unwrap().len(), EXPECTED_KEYS + 1);
    }

    #[test]
    fn parse_error_keeps_success_status() {
        let extraction = Extraction {
            title: String::new(),
            description: "not json".into(),
            date: String::new(),
            error: None,
            parse_error: Some("expected value at line 1 column 1".into()),
        };
        let record = build_record(Path::new("ms1-1.jpg"), &extraction);
        assert_eq!(record.status, "success");
        assert!(record.parse_error.is_some());
        assert_eq!(record.ead_scope_and_content, "not json");
    }
}
