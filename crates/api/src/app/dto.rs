use serde::{Deserialize, Serialize};

use mousedeck_core::{
    CategoryId, DomainError, ListQuery, Mouse, MouseFilter, NewCategory, NewMouse, SortOrder,
};

// -------------------------
// Request DTOs
// -------------------------

/// `POST /api/mice` body. Required fields are optional here so a missing one is
/// reported as a validation error instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMouseRequest {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub details: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub is_generated: bool,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

impl CreateMouseRequest {
    pub fn into_new_mouse(self) -> Result<NewMouse, DomainError> {
        let mut errors = Vec::new();
        if self.name.is_none() {
            errors.push("name is required".to_string());
        }
        if self.price.is_none() {
            errors.push("price is required".to_string());
        }

        let new = NewMouse {
            name: self.name.clone().unwrap_or_default(),
            price: self.price.unwrap_or(f64::NAN),
            details: self.details,
            image: self.image,
            is_generated: self.is_generated,
            category_ids: self.category_ids,
        };

        if let Err(DomainError::Validation(found)) = new.validate() {
            // A missing field already has its own message.
            errors.extend(found.into_iter().filter(|msg| {
                !(self.name.is_none() && msg.starts_with("name"))
                    && !(self.price.is_none() && msg.starts_with("price"))
            }));
        }

        if errors.is_empty() {
            Ok(new)
        } else {
            Err(DomainError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CreateCategoryRequest {
    pub fn into_new_category(self) -> Result<NewCategory, DomainError> {
        let new = NewCategory {
            name: self.name.unwrap_or_default(),
            description: self.description,
        };
        new.validate()?;
        Ok(new)
    }
}

/// Raw `GET /api/mice` query string. Empty values count as absent.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMiceParams {
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort_order: Option<String>,
    pub order: Option<String>,
    pub search: Option<String>,
    pub is_generated: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub limit: Option<String>,
}

impl ListMiceParams {
    pub fn into_query(self) -> Result<ListQuery, DomainError> {
        let mut errors = Vec::new();

        let min_price = parse_param::<f64>("minPrice", self.min_price, &mut errors);
        let max_price = parse_param::<f64>("maxPrice", self.max_price, &mut errors);
        let page = parse_param::<u32>("page", self.page, &mut errors);
        let page_size = parse_param::<u32>("pageSize", self.page_size.or(self.limit), &mut errors);
        let is_generated = parse_param::<bool>("isGenerated", self.is_generated, &mut errors);

        // Unknown sort values fall back to the default ordering.
        let sort = non_empty(self.sort_order)
            .or_else(|| non_empty(self.order))
            .and_then(|raw| SortOrder::parse(&raw));

        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let query = ListQuery {
            filter: MouseFilter {
                min_price,
                max_price,
                search: non_empty(self.search),
                is_generated,
            },
            sort,
            page,
            page_size,
        };
        query.validate()?;
        Ok(query)
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_param<T: std::str::FromStr>(
    name: &str,
    raw: Option<String>,
    errors: &mut Vec<String>,
) -> Option<T> {
    let raw = non_empty(raw)?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(format!("{name} has an invalid value: {raw}"));
            None
        }
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct DeleteMouseResponse {
    pub message: String,
    pub mouse: Mouse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteGeneratedResponse {
    pub message: String,
    pub deleted_count: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub push_connections: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_reported_once_each() {
        let err = CreateMouseRequest::default().into_new_mouse().unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation(vec![
                "name is required".to_string(),
                "price is required".to_string(),
            ])
        );
    }

    #[test]
    fn invalid_price_is_reported_with_present_name() {
        let req = CreateMouseRequest {
            name: Some("Test Mouse".into()),
            price: Some(-1.0),
            ..CreateMouseRequest::default()
        };
        assert_eq!(req.into_new_mouse().unwrap_err().messages().len(), 1);
    }

    #[test]
    fn list_params_accept_aliases_and_ignore_blanks() {
        let params = ListMiceParams {
            min_price: Some("".into()),
            max_price: Some("100".into()),
            order: Some("desc".into()),
            limit: Some("3".into()),
            ..ListMiceParams::default()
        };
        let query = params.into_query().unwrap();
        assert_eq!(query.filter.min_price, None);
        assert_eq!(query.filter.max_price, Some(100.0));
        assert_eq!(query.sort, Some(SortOrder::Descending));
        assert_eq!(query.page_size, Some(3));
    }

    #[test]
    fn unparsable_numbers_are_validation_errors() {
        let params = ListMiceParams {
            min_price: Some("cheap".into()),
            page: Some("-1".into()),
            ..ListMiceParams::default()
        };
        assert_eq!(params.into_query().unwrap_err().messages().len(), 2);
    }
}
