use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugSource {
    /// The external naming collaborator resolved the slug
    Resolver,
    /// Local deterministic fallback
    Fallback,
}

#[derive(Debug, Clone)]
pub struct SlugResolution {
    pub slug: String,
    pub source: SlugSource,
}

/// Repository for the external naming collaborator that turns a subject name
/// into a stable folder slug.
#[async_trait]
pub trait SlugRepository: Send + Sync {
    async fn resolve_slug(
        &self,
        subject_name: &str,
        language_code: &str,
    ) -> Result<SlugResolution, String>;
}

/// Deterministic local slug: lowercase, unicode alphanumerics kept, runs of
/// anything else collapsed to a single dash. Stable across reruns so it is a
/// safe fallback when the naming collaborator is unreachable.
pub fn slugify(subject_name: &str) -> String {
    let mut slug = String::with_capacity(subject_name.len());
    let mut previous_dash = true;
    for ch in subject_name.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            previous_dash = false;
        } else if !previous_dash {
            slug.push('-');
            previous_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}

#[derive(Debug, Deserialize)]
struct SlugResponse {
    slug: String,
}

/// HTTP implementation of the naming collaborator
pub struct HttpSlugRepository {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpSlugRepository {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl SlugRepository for HttpSlugRepository {
    async fn resolve_slug(
        &self,
        subject_name: &str,
        language_code: &str,
    ) -> Result<SlugResolution, String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "subjectName": subject_name,
                "languageCode": language_code,
            }))
            .send()
            .await
            .map_err(|e| format!("slug resolver request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("slug resolver returned status {}", status));
        }

        let payload: SlugResponse = response
            .json()
            .await
            .map_err(|e| format!("slug resolver returned malformed body: {}", e))?;

        Ok(SlugResolution {
            slug: payload.slug,
            source: SlugSource::Resolver,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_slugify_is_deterministic_and_collision_safe() {
        assert_eq!(slugify("Gyeongbokgung Palace"), "gyeongbokgung-palace");
        assert_eq!(slugify("Gyeongbokgung Palace"), slugify("Gyeongbokgung Palace"));
    }

    #[test]
    fn test_slugify_keeps_unicode_alphanumerics() {
        assert_eq!(slugify("경복궁"), "경복궁");
        assert_eq!(slugify("국립중앙박물관 (서울)"), "국립중앙박물관-서울");
    }

    #[test]
    fn test_slugify_never_returns_empty() {
        assert_eq!(slugify("!!!"), "unnamed");
        assert_eq!(slugify(""), "unnamed");
    }
}
