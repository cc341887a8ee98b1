//! Organizations: the tenant boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use callgrid_auth::OrganizationStatus;
use callgrid_core::{DomainError, DomainResult, OrganizationId};

use crate::slug::slugify;

const MIN_NAME_CHARS: usize = 2;
const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    /// Unique across all organizations.
    pub slug: String,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for the founding flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    /// Slug derived from `name`; the store appends a counter if it is taken.
    pub base_slug: String,
    pub industry: Option<String>,
    pub website: Option<String>,
}

impl NewOrganization {
    pub fn new(name: &str, industry: Option<&str>, website: Option<&str>) -> DomainResult<Self> {
        let name = validate_name(name)?;
        Ok(Self {
            base_slug: slugify(&name),
            name,
            industry: normalize_optional(industry),
            website: validate_website(website)?,
        })
    }
}

/// Partial update restricted to the editable fields.
///
/// `None` leaves a field untouched. For `industry` and `website` an empty
/// (or whitespace-only) string clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationPatch {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
}

impl OrganizationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.industry.is_none() && self.website.is_none()
    }

    /// Validate and normalize the patch.
    pub fn validated(&self) -> DomainResult<Self> {
        Ok(Self {
            name: self.name.as_deref().map(validate_name).transpose()?,
            industry: self
                .industry
                .as_deref()
                .map(|i| i.trim().to_string()),
            website: match self.website.as_deref() {
                Some(w) => Some(validate_website(Some(w))?.unwrap_or_default()),
                None => None,
            },
        })
    }

    /// Apply a validated patch. The slug is never changed by a rename.
    pub fn apply_to(&self, org: &Organization) -> Organization {
        let mut updated = org.clone();
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(industry) = &self.industry {
            updated.industry = normalize_optional(Some(industry));
        }
        if let Some(website) = &self.website {
            updated.website = normalize_optional(Some(website));
        }
        updated
    }
}

/// Cached answer to "which organization does the current identity belong to".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OrganizationState {
    /// Not resolved yet, or resolution failed and must be retried.
    #[default]
    Unresolved,
    Absent,
    Present(Organization),
}

impl OrganizationState {
    pub fn status(&self) -> OrganizationStatus {
        match self {
            OrganizationState::Unresolved => OrganizationStatus::Unresolved,
            OrganizationState::Absent => OrganizationStatus::Absent,
            OrganizationState::Present(_) => OrganizationStatus::Present,
        }
    }

    pub fn organization(&self) -> Option<&Organization> {
        match self {
            OrganizationState::Present(org) => Some(org),
            _ => None,
        }
    }

    pub fn has_organization(&self) -> Option<bool> {
        self.status().as_flag()
    }
}

fn validate_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    let chars = name.chars().count();
    if chars < MIN_NAME_CHARS {
        return Err(DomainError::validation(format!(
            "organization name must be at least {MIN_NAME_CHARS} characters"
        )));
    }
    if chars > MAX_NAME_CHARS {
        return Err(DomainError::validation(format!(
            "organization name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(name.to_string())
}

fn validate_website(raw: Option<&str>) -> DomainResult<Option<String>> {
    let Some(website) = normalize_optional(raw) else {
        return Ok(None);
    };
    let parsed = url::Url::parse(&website)
        .map_err(|_| DomainError::validation("website must be a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(DomainError::validation("website must be an http(s) URL"));
    }
    Ok(Some(website))
}

fn normalize_optional(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
