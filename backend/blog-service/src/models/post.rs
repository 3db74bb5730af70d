use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Words per minute used for the reading time estimate.
const WORDS_PER_MINUTE: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

impl FromStr for PostStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            other => Err(AppError::Internal(format!("unknown post status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Tutorial,
    Article,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Tutorial => "tutorial",
            PostType::Article => "article",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "tutorial" => Ok(PostType::Tutorial),
            "article" => Ok(PostType::Article),
            other => Err(AppError::field(
                "post_type",
                format!("'{other}' is not a valid choice."),
            )),
        }
    }
}

/// Category as embedded in a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(rename = "parent")]
    pub parent_id: Option<i64>,
}

/// Tag as embedded in a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
}

/// A blog post with its category, tags and author resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub cover_image: Option<String>,
    pub status: PostStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_featured: bool,
    pub is_free: bool,
    pub price: Decimal,
    pub post_type: PostType,
    pub seo_title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub reading_time_override: Option<i32>,
    pub category: Option<CategoryRef>,
    pub tags: Vec<TagRef>,
    pub author: Option<Author>,
}

impl Post {
    pub fn is_published(&self) -> bool {
        self.status == PostStatus::Published
    }

    /// Estimated reading time in minutes, never less than one.
    pub fn reading_time(&self) -> u32 {
        if let Some(minutes) = self.reading_time_override.filter(|m| *m > 0) {
            return minutes as u32;
        }
        let words = self.content.split_whitespace().count() as f64;
        ((words / WORDS_PER_MINUTE).round() as u32).max(1)
    }

    pub fn seo_title(&self) -> &str {
        non_blank(self.seo_title.as_deref()).unwrap_or(&self.title)
    }

    pub fn meta_description(&self) -> &str {
        non_blank(self.meta_description.as_deref()).unwrap_or(&self.excerpt)
    }

    /// Comma separated `meta_keywords`, trimmed, empties dropped.
    pub fn keywords(&self) -> Vec<String> {
        self.meta_keywords
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|kw| !kw.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Free posts cost nothing; paid posts cost something.
    pub fn validate_pricing(&self) -> Result<()> {
        validate_pricing(self.is_free, self.price)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn validate_pricing(is_free: bool, price: Decimal) -> Result<()> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(AppError::field("price", "Price cannot be negative."));
    }
    match (is_free, price.is_zero()) {
        (true, false) => Err(AppError::field("price", "Free posts must have a price of 0.")),
        (false, true) => Err(AppError::field(
            "price",
            "Paid posts must have a price greater than 0.",
        )),
        _ => Ok(()),
    }
}

/// Prices are always carried with two decimal places ("49.00", "0.00").
pub fn normalize_price(price: Decimal) -> Decimal {
    let mut price = price;
    price.rescale(2);
    price
}

/// Lowercase, ASCII alphanumerics separated by single hyphens.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }

    slug
}


#[cfg(test)]
mod tests {
    use super::fixtures::post;
    use super::*;

    #[test]
    fn reading_time_rounds_and_has_floor() {
        let mut p = post(1, true, Decimal::ZERO);
        p.content = "word ".repeat(10);
        assert_eq!(p.reading_time(), 1);

        p.content = "word ".repeat(700);
        assert_eq!(p.reading_time(), 4);

        p.reading_time_override = Some(12);
        assert_eq!(p.reading_time(), 12);
    }

    #[test]
    fn seo_fields_fall_back() {
        let mut p = post(1, true, Decimal::ZERO);
        assert_eq!(p.seo_title(), "Post 1");
        assert_eq!(p.meta_description(), "Short summary");

        p.seo_title = Some("Better title".into());
        p.meta_description = Some("   ".into());
        assert_eq!(p.seo_title(), "Better title");
        assert_eq!(p.meta_description(), "Short summary");
    }

    #[test]
    fn keywords_are_trimmed() {
        let mut p = post(1, true, Decimal::ZERO);
        assert!(p.keywords().is_empty());

        p.meta_keywords = Some(" django, rest ,, jwt ".into());
        assert_eq!(p.keywords(), vec!["django", "rest", "jwt"]);
    }

    #[test]
    fn pricing_invariant() {
        assert!(validate_pricing(true, Decimal::ZERO).is_ok());
        assert!(validate_pricing(false, Decimal::new(2999, 2)).is_ok());
        assert!(validate_pricing(true, Decimal::new(100, 2)).is_err());
        assert!(validate_pricing(false, Decimal::ZERO).is_err());
        assert!(validate_pricing(false, Decimal::new(-5, 0)).is_err());
    }

    #[test]
    fn prices_carry_two_places() {
        assert_eq!(normalize_price(Decimal::new(49, 0)).to_string(), "49.00");
        assert_eq!(normalize_price(Decimal::new(2999, 2)).to_string(), "29.99");
        assert_eq!(normalize_price(Decimal::ZERO).to_string(), "0.00");
    }

    #[test]
    fn slugify_titles() {
        assert_eq!(slugify("Advanced Tutorial"), "advanced-tutorial");
        assert_eq!(slugify("  Django -- REST_framework!  "), "django-rest-framework");
        assert_eq!(slugify("JWT 101"), "jwt-101");
    }

    #[test]
    fn post_type_parsing() {
        assert_eq!("article".parse::<PostType>().unwrap(), PostType::Article);
        assert!("video".parse::<PostType>().is_err());
    }
}
