//! Template request DTOs.

use serde::Deserialize;
use validator::Validate;

use crate::models::{CreateTemplate, InvoiceType, TemplateData, UpdateTemplate};

/// Body for `POST /templates`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub invoice_type: InvoiceType,
    #[serde(default)]
    pub template_data: TemplateData,
    pub default_terms: Option<String>,
    pub default_notes: Option<String>,
}

impl From<CreateTemplateRequest> for CreateTemplate {
    fn from(req: CreateTemplateRequest) -> Self {
        CreateTemplate {
            name: req.name,
            description: req.description,
            invoice_type: req.invoice_type,
            template_data: req.template_data,
            default_terms: req.default_terms,
            default_notes: req.default_notes,
        }
    }
}

/// Body for `PUT /templates/:id`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTemplateRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub template_data: Option<TemplateData>,
    pub default_terms: Option<String>,
    pub default_notes: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdateTemplateRequest> for UpdateTemplate {
    fn from(req: UpdateTemplateRequest) -> Self {
        UpdateTemplate {
            name: req.name,
            description: req.description,
            template_data: req.template_data,
            default_terms: req.default_terms,
            default_notes: req.default_notes,
            is_active: req.is_active,
        }
    }
}
