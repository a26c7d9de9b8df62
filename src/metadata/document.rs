//! Certificate metadata documents
//!
//! [`canonicalize`] turns certificate fields into the fixed document shape
//! consumed by wallets and marketplaces. Field and attribute order never
//! varies, so [`canonical_bytes`] of equal inputs are byte-identical and the
//! local fallback pointer is a pure function of the certificate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CertificateError, Result, TokenId};

/// Placeholder certificate artwork.
pub const DEFAULT_CERTIFICATE_IMAGE: &str =
    "ipfs://bafkreih7qfhvoh3gvjrnwnqmkfk3mly5s2lx3nlwb6cxdxe6motpbbqpsu";

/// Public verification page; the token id (or `pending`) is appended.
pub const DEFAULT_VERIFY_BASE_URL: &str = "https://linkedinproof.app/verify";

/// Input to the upload path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateFields {
    pub course_name: String,
    pub issuer_name: String,
    #[serde(default)]
    pub student_name: Option<String>,
    pub completion_date: DateTime<Utc>,
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    /// Known only when metadata is produced after minting
    #[serde(default)]
    pub token_id: Option<TokenId>,
}

/// Deployment-specific constants stamped into every document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTemplate {
    pub image: String,
    pub verify_base_url: String,
}

impl Default for DocumentTemplate {
    fn default() -> Self {
        Self {
            image: DEFAULT_CERTIFICATE_IMAGE.to_string(),
            verify_base_url: DEFAULT_VERIFY_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_type: Option<String>,
    pub trait_type: String,
    pub value: AttributeValue,
}

impl Attribute {
    fn text(trait_type: &str, value: impl Into<String>) -> Self {
        Self {
            display_type: None,
            trait_type: trait_type.to_string(),
            value: AttributeValue::Text(value.into()),
        }
    }

    fn date(trait_type: &str, at: &DateTime<Utc>) -> Self {
        Self {
            display_type: Some("date".to_string()),
            trait_type: trait_type.to_string(),
            value: AttributeValue::Number(at.timestamp()),
        }
    }
}

/// The JSON document a metadata pointer resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub name: String,
    pub description: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_url: Option<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl MetadataDocument {
    /// First attribute with the given trait name.
    pub fn attribute(&self, trait_type: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|a| a.trait_type == trait_type)
            .map(|a| &a.value)
    }

    /// Course name from the `Course` attribute.
    pub fn course(&self) -> Option<&str> {
        match self.attribute("Course") {
            Some(AttributeValue::Text(course)) => Some(course),
            _ => None,
        }
    }
}

/// Build the canonical document for a certificate.
pub fn canonicalize(fields: &CertificateFields, template: &DocumentTemplate) -> Result<MetadataDocument> {
    let course = fields.course_name.trim();
    let issuer = fields.issuer_name.trim();
    if course.is_empty() {
        return Err(CertificateError::InvalidFields("course name is required".into()));
    }
    if issuer.is_empty() {
        return Err(CertificateError::InvalidFields("issuer name is required".into()));
    }

    let student = fields
        .student_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("N/A");

    let mut attributes = vec![
        Attribute::text("Course", course),
        Attribute::text("Issuer", issuer),
        Attribute::text("Student", student),
        Attribute::date("Date", &fields.completion_date),
    ];
    if let Some(expires) = &fields.expiration_date {
        attributes.push(Attribute::date("Expiration Date", expires));
    }

    let verify_slug = fields
        .token_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "pending".to_string());

    Ok(MetadataDocument {
        name: format!("Certificate: {course}"),
        description: format!("Awarded by {issuer}"),
        image: template.image.clone(),
        external_url: Some(format!(
            "{}/{}",
            template.verify_base_url.trim_end_matches('/'),
            verify_slug
        )),
        attributes,
    })
}

/// Serialized form used for hashing and upload.
pub fn canonical_bytes(document: &MetadataDocument) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(document)?)
}
