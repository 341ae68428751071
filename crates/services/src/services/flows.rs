//! Thin prompt wrappers over [`ClaudeApiClient`].
//!
//! Each flow is one prompt with a typed JSON output. There is no chaining;
//! retries live in the shared client.

use serde::{Deserialize, Serialize};

use crate::services::claude_api::{ClaudeApiClient, ClaudeApiError};

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkTitle {
    pub title: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DailyWisdom {
    pub wisdom: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiIntegrationSuggestion {
    pub api_type: String,
    pub integration_guide: String,
}

/// Raw shape the model answers with for project resources: flat string lists.
#[derive(Debug, Deserialize)]
pub struct RawProjectResources {
    pub suggested_tools: Vec<String>,
    pub case_studies: Vec<String>,
    pub reference_links: Vec<String>,
    pub prompt_examples: Vec<String>,
}

/// A single recommended resource after categorization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedResourceItem {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResourceRecommendations {
    pub suggested_tools: Vec<SuggestedResourceItem>,
    pub case_studies: Vec<SuggestedResourceItem>,
    pub reference_links: Vec<SuggestedResourceItem>,
    pub prompt_examples: Vec<String>,
}

/// Suggest a concise title for a saved link.
pub async fn autocomplete_link_title(
    claude: &ClaudeApiClient,
    link: &str,
) -> Result<LinkTitle, ClaudeApiError> {
    let prompt = format!(
        "You are a title autocompletion service. Given a link, return a concise \
         and descriptive title for it.\n\n\
         Link: {link}\n\n\
         Respond with a JSON object: {{\"title\": \"...\"}}"
    );
    claude.ask_json(&prompt, None).await
}

/// One short inspirational statement, regenerated per request.
pub async fn generate_daily_wisdom(
    claude: &ClaudeApiClient,
) -> Result<DailyWisdom, ClaudeApiError> {
    let prompt = "Generate a single, unique piece of wisdom or a thought-provoking \
        statement suitable for daily inspiration. It may touch on creativity, \
        problem-solving, productivity, or general life insight. Keep it to one or \
        two sentences, avoid clichés, and do not add any preamble or markdown.\n\n\
        Respond with a JSON object: {\"wisdom\": \"...\"}";
    claude.ask_json(prompt, None).await
}

/// Detect what service an API key belongs to and draft an integration guide.
pub async fn suggest_api_integrations(
    claude: &ClaudeApiClient,
    key_name: &str,
    key_value: &str,
) -> Result<ApiIntegrationSuggestion, ClaudeApiError> {
    let prompt = format!(
        "You are an expert in API integrations. Given the name and value of an \
         API key, determine which service the key belongs to and provide a short \
         integration guide or code snippet.\n\n\
         API Key Name: {key_name}\n\
         API Key Value: {key_value}\n\n\
         Respond with a JSON object: \
         {{\"api_type\": \"...\", \"integration_guide\": \"...\"}}"
    );
    claude.ask_json(&prompt, None).await
}

/// Recommend tools, case studies, links and prompt examples for a project type.
pub async fn recommend_project_resources(
    claude: &ClaudeApiClient,
    project_type: &str,
) -> Result<ProjectResourceRecommendations, ClaudeApiError> {
    let prompt = format!(
        "You are an assistant helping a team find resources for their projects. \
         Based on the project type, recommend relevant tools, case studies, \
         reference links, and prompt examples.\n\n\
         Project Type: {project_type}\n\n\
         Respond with a JSON object with these keys, each a list of strings:\n\
         - suggested_tools: tools recommended for the project\n\
         - case_studies: relevant case studies, each as \"Title: description\"\n\
         - reference_links: URLs relevant to the project\n\
         - prompt_examples: prompt examples relevant to the project"
    );
    let raw: RawProjectResources = claude.ask_json(&prompt, None).await?;
    Ok(categorize_resources(raw))
}

/// Turn the model's flat string lists into structured items. Case studies
/// split on the first ": " into name and description; any entry starting
/// with "http" carries its own text as the url.
fn categorize_resources(raw: RawProjectResources) -> ProjectResourceRecommendations {
    ProjectResourceRecommendations {
        suggested_tools: raw.suggested_tools.into_iter().map(plain_item).collect(),
        case_studies: raw.case_studies.into_iter().map(case_study_item).collect(),
        reference_links: raw.reference_links.into_iter().map(plain_item).collect(),
        prompt_examples: raw.prompt_examples,
    }
}

fn plain_item(entry: String) -> SuggestedResourceItem {
    let url = entry.starts_with("http").then(|| entry.clone());
    SuggestedResourceItem {
        name: entry,
        description: None,
        url,
    }
}

fn case_study_item(entry: String) -> SuggestedResourceItem {
    match entry.split_once(": ") {
        Some((name, description)) => SuggestedResourceItem {
            name: name.to_string(),
            description: Some(description.to_string()),
            url: None,
        },
        None => plain_item(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_studies_split_on_first_colon_space() {
        let item = case_study_item("Acme Redesign: cut churn by 20%: then 30%".to_string());
        assert_eq!(item.name, "Acme Redesign");
        assert_eq!(item.description.as_deref(), Some("cut churn by 20%: then 30%"));
        assert!(item.url.is_none());
    }

    #[test]
    fn case_study_without_separator_stays_whole() {
        let item = case_study_item("An undocumented rewrite".to_string());
        assert_eq!(item.name, "An undocumented rewrite");
        assert!(item.description.is_none());
    }

    #[test]
    fn http_entries_carry_their_url() {
        let link = plain_item("https://docs.rs/sqlx".to_string());
        assert_eq!(link.url.as_deref(), Some("https://docs.rs/sqlx"));

        let tool = plain_item("Figma".to_string());
        assert!(tool.url.is_none());
    }

    #[test]
    fn categorize_keeps_prompt_examples_untouched() {
        let raw = RawProjectResources {
            suggested_tools: vec!["Figma".to_string()],
            case_studies: vec!["Acme: shipped fast".to_string()],
            reference_links: vec!["https://example.com".to_string()],
            prompt_examples: vec!["Draft a launch plan".to_string()],
        };
        let out = categorize_resources(raw);
        assert_eq!(out.prompt_examples, vec!["Draft a launch plan".to_string()]);
        assert_eq!(out.case_studies[0].name, "Acme");
        assert_eq!(out.reference_links[0].url.as_deref(), Some("https://example.com"));
    }
}
