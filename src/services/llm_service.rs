use async_trait::async_trait;
use axum::http::StatusCode;
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::models::{ChatTurn, CurriculumContext, QuestionCategory};

/// Number of prior turns forwarded to the provider
const CHAT_HISTORY_LIMIT: usize = 20;

/// Errors surfaced by the LLM provider
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("quota exceeded")]
    QuotaExceeded,
    #[error("provider error: {0}")]
    Api(String),
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl LlmError {
    pub fn code(&self) -> &'static str {
        match self {
            LlmError::RateLimited => "LLM_RATE_LIMIT",
            LlmError::QuotaExceeded => "LLM_QUOTA_EXCEEDED",
            _ => "LLM_API_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            LlmError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            LlmError::QuotaExceeded => StatusCode::PAYMENT_REQUIRED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to end users
    pub fn user_message(&self) -> &'static str {
        match self {
            LlmError::RateLimited => {
                "The AI service rate limit was exceeded. Please try again shortly."
            }
            LlmError::QuotaExceeded => "The AI service quota has been exhausted.",
            _ => "An error occurred while generating the AI response",
        }
    }
}

/// A prepared provider call: system prompt plus message history
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<ChatTurn>,
}

pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Seam to the text-generation provider. Implemented by the HTTP client and
/// by scripted fakes in tests.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Blocking completion returning the full text
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    /// Incremental completion yielding text fragments in provider order.
    /// Dropping the returned stream releases the provider-side request.
    async fn stream(&self, request: CompletionRequest) -> Result<CompletionStream, LlmError>;
}

/// Orchestrates curriculum-aware completions over a provider
#[derive(Clone)]
pub struct LlmService {
    provider: Arc<dyn CompletionProvider>,
}

impl LlmService {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Full chat completion for the given user message and context
    pub async fn generate_response(
        &self,
        message: &str,
        context: &CurriculumContext,
    ) -> Result<String, LlmError> {
        let request = completion_request(message, context);
        let response = self.provider.complete(request).await?;
        info!("Chat response generated successfully");
        Ok(response)
    }

    /// Streaming chat completion
    pub async fn stream_response(
        &self,
        message: &str,
        context: &CurriculumContext,
    ) -> Result<CompletionStream, LlmError> {
        let request = completion_request(message, context);
        self.provider.stream(request).await
    }

    /// Rework curriculum content into an improved draft
    pub async fn enhance_content(
        &self,
        content: &str,
        context: &CurriculumContext,
    ) -> Result<String, LlmError> {
        let prompt = build_enhance_prompt(content, context);
        let request = CompletionRequest {
            system: build_system_prompt(context),
            messages: vec![ChatTurn {
                role: "user".to_string(),
                content: prompt,
            }],
        };
        let response = self.provider.complete(request).await?;
        info!("Content enhancement completed");
        Ok(response)
    }

    /// Ask the provider for clarifying questions and parse the numbered list
    pub async fn generate_clarifying_questions(
        &self,
        context: &CurriculumContext,
    ) -> Result<Vec<String>, LlmError> {
        let prompt = build_questions_prompt(context);
        let request = CompletionRequest {
            system: build_system_prompt(context),
            messages: vec![ChatTurn {
                role: "user".to_string(),
                content: prompt,
            }],
        };
        let response = self.provider.complete(request).await?;
        let questions = parse_numbered_lines(&response);
        info!("Generated {} clarifying questions", questions.len());
        Ok(questions)
    }
}

fn completion_request(message: &str, context: &CurriculumContext) -> CompletionRequest {
    // Only the most recent turns are forwarded
    let skip = context
        .chat_history
        .len()
        .saturating_sub(CHAT_HISTORY_LIMIT);
    let mut messages: Vec<ChatTurn> = context.chat_history[skip..].to_vec();
    messages.push(ChatTurn {
        role: "user".to_string(),
        content: message.to_string(),
    });
    CompletionRequest {
        system: build_system_prompt(context),
        messages,
    }
}

/// System prompt shared by all curriculum completions
pub fn build_system_prompt(context: &CurriculumContext) -> String {
    let audience = context.target_audience.as_deref().unwrap_or("not decided");
    let duration = context.duration.as_deref().unwrap_or("not decided");
    let format = context.curriculum_type.as_deref().unwrap_or("not decided");

    format!(
        r#"You are an AI education expert and training-curriculum design specialist.

Help freelance instructors author AI training curricula for a wide range of audiences.

### Role and goals:
1. Design practical AI curricula tailored to the audience's characteristics
2. Provide hands-on content reflecting current AI tools and techniques
3. Propose a stepwise, well-structured learning path

### Current context:
- Audience: {audience}
- Duration: {duration}
- Format: {format}

### Response guidelines:
1. Give concrete, actionable suggestions
2. Include learning objectives and practice work for each session
3. Use terminology and examples appropriate to the audience level
4. Reflect up-to-date AI tools and trends
5. Suggest assessment methods and assignments

Structure every response as markdown."#
    )
}

pub fn build_enhance_prompt(content: &str, context: &CurriculumContext) -> String {
    let audience = context.target_audience.as_deref().unwrap_or("general");
    let format = context.curriculum_type.as_deref().unwrap_or("online");

    format!(
        r#"Please improve the following curriculum content:

{content}

Improvement requests:
1. Make the content more concrete and practical
2. Add elements that increase learner engagement
3. Reflect up-to-date AI tools and trends
4. Round out assessment and feedback methods

Audience: {audience}
Format: {format}

Provide the improved version as markdown."#
    )
}

pub fn build_questions_prompt(context: &CurriculumContext) -> String {
    let audience = context.target_audience.as_deref().unwrap_or("not decided");
    let duration = context.duration.as_deref().unwrap_or("not decided");
    let format = context.curriculum_type.as_deref().unwrap_or("not decided");
    let progress = if context.current_content.is_some() {
        "in progress"
    } else {
        "not started"
    };

    format!(
        r#"Analyse the current state of this curriculum draft and generate three questions that would make the curriculum more specific and effective.

Current state:
- Audience: {audience}
- Duration: {duration}
- Format: {format}
- Draft: {progress}

Generate the questions from these angles:
1. The learners' concrete characteristics and needs
2. The practice environment and tool availability
3. Assessment methods and outcome measurement

Write each question on a single line, numbered."#
    )
}

/// Extract "1. ..." style lines from a completion
pub fn parse_numbered_lines(response: &str) -> Vec<String> {
    response
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
            if digits == 0 {
                return None;
            }
            let rest = line[digits..].strip_prefix('.')?;
            let question = rest.trim();
            (!question.is_empty()).then(|| question.to_string())
        })
        .collect()
}

/// Derive follow-up suggestions once the full reply is known
pub fn extract_suggestions(response: &str, context: &CurriculumContext) -> Vec<String> {
    // Very short replies don't warrant follow-ups
    if response.chars().count() < 100 {
        return Vec::new();
    }

    let mut suggestions = Vec::new();
    if context.target_audience.is_none() {
        suggestions.push("Define the target learners more specifically".to_string());
    }
    if context.duration.is_none() {
        suggestions.push("Suggest an appropriate course duration".to_string());
    }
    if context.curriculum_type.as_deref() == Some("online") {
        suggestions.push("Recommend interaction formats that work well online".to_string());
    }

    for default in [
        "Show me more concrete practice exercises",
        "Adjust the difficulty level",
        "Add assessment methods",
    ] {
        suggestions.push(default.to_string());
    }

    suggestions.truncate(3);
    suggestions
}

/// Summarize what changed between the original and enhanced content
pub fn analyze_improvements(original: &str, enhanced: &str) -> Vec<String> {
    let mut improvements = Vec::new();

    if enhanced.len() as f64 > original.len() as f64 * 1.2 {
        improvements.push("More concrete and detailed content".to_string());
    }

    let original_headers = count_lines_starting_with(original, &["#"]);
    let enhanced_headers = count_lines_starting_with(enhanced, &["#"]);
    if enhanced_headers > original_headers {
        improvements.push("Improved structure and readability".to_string());
    }

    let original_lists = count_lines_starting_with(original, &["- ", "* "]);
    let enhanced_lists = count_lines_starting_with(enhanced, &["- ", "* "]);
    if enhanced_lists > original_lists {
        improvements.push("Content organized into clearer items".to_string());
    }

    if improvements.is_empty() {
        improvements.push("Improved content quality".to_string());
        improvements.push("More learner-centred structure".to_string());
    }
    improvements
}

fn count_lines_starting_with(text: &str, prefixes: &[&str]) -> usize {
    text.lines()
        .map(str::trim_start)
        .filter(|line| prefixes.iter().any(|p| line.starts_with(p)))
        .count()
}

/// Group clarifying questions into keyword categories
pub fn categorize_questions(questions: &[String]) -> Vec<QuestionCategory> {
    let categories: [(&str, &[&str]); 4] = [
        ("Audience", &["audience", "learner", "level", "background"]),
        ("Environment", &["environment", "tool", "device", "platform"]),
        ("Content structure", &["content", "structure", "order", "step", "module"]),
        ("Assessment", &["assess", "evaluat", "assignment", "feedback", "measure"]),
    ];

    let mut result: Vec<QuestionCategory> = Vec::new();
    let mut categorized: Vec<&String> = Vec::new();

    for (name, keywords) in categories {
        let matched: Vec<String> = questions
            .iter()
            .filter(|q| {
                let lower = q.to_lowercase();
                keywords.iter().any(|k| lower.contains(k))
            })
            .cloned()
            .collect();
        if !matched.is_empty() {
            for q in questions.iter() {
                if matched.contains(q) && !categorized.contains(&q) {
                    categorized.push(q);
                }
            }
            result.push(QuestionCategory {
                name: name.to_string(),
                questions: matched,
            });
        }
    }

    let uncategorized: Vec<String> = questions
        .iter()
        .filter(|q| !categorized.contains(q))
        .cloned()
        .collect();
    if !uncategorized.is_empty() {
        result.push(QuestionCategory {
            name: "Other".to_string(),
            questions: uncategorized,
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_lines_are_extracted() {
        let response = "Here are some questions:\n1. Who are the learners?\n2. Which tools are available?\n\n3. How will outcomes be measured?\nAnything else?";
        let questions = parse_numbered_lines(response);
        assert_eq!(
            questions,
            vec![
                "Who are the learners?",
                "Which tools are available?",
                "How will outcomes be measured?"
            ]
        );
    }

    #[test]
    fn short_replies_produce_no_suggestions() {
        let ctx = CurriculumContext::default();
        assert!(extract_suggestions("ok", &ctx).is_empty());
    }

    #[test]
    fn suggestions_prefer_contextual_gaps_and_cap_at_three() {
        let ctx = CurriculumContext {
            curriculum_type: Some("online".to_string()),
            ..Default::default()
        };
        let long_reply = "x".repeat(200);
        let suggestions = extract_suggestions(&long_reply, &ctx);
        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions[0], "Define the target learners more specifically");
        assert_eq!(suggestions[1], "Suggest an appropriate course duration");
        assert_eq!(
            suggestions[2],
            "Recommend interaction formats that work well online"
        );
    }

    #[test]
    fn improvements_reflect_markdown_growth() {
        let original = "plain text";
        let enhanced = "# Course\n\n- item one\n- item two\n\nA considerably longer body of text than before.";
        let improvements = analyze_improvements(original, enhanced);
        assert!(improvements.contains(&"More concrete and detailed content".to_string()));
        assert!(improvements.contains(&"Improved structure and readability".to_string()));
    }

    #[test]
    fn improvements_fall_back_to_defaults() {
        let improvements = analyze_improvements("same text", "same text");
        assert_eq!(improvements.len(), 2);
    }

    #[test]
    fn questions_are_grouped_by_keyword() {
        let questions = vec![
            "What background do the learners have?".to_string(),
            "Which platform will host the course?".to_string(),
            "Is there a budget?".to_string(),
        ];
        let categories = categorize_questions(&questions);
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Audience", "Environment", "Other"]);
    }

    #[test]
    fn history_is_truncated_to_recent_turns() {
        let context = CurriculumContext {
            chat_history: (0..30)
                .map(|i| ChatTurn {
                    role: "user".to_string(),
                    content: format!("turn {}", i),
                })
                .collect(),
            ..Default::default()
        };
        let request = completion_request("latest", &context);
        // 20 history turns plus the new message
        assert_eq!(request.messages.len(), 21);
        assert_eq!(request.messages[0].content, "turn 10");
        assert_eq!(request.messages.last().unwrap().content, "latest");
    }

    #[test]
    fn system_prompt_reflects_context() {
        let context = CurriculumContext {
            target_audience: Some("HR teams".to_string()),
            duration: Some("6 weeks".to_string()),
            ..Default::default()
        };
        let prompt = build_system_prompt(&context);
        assert!(prompt.contains("Audience: HR teams"));
        assert!(prompt.contains("Duration: 6 weeks"));
        assert!(prompt.contains("Format: not decided"));
    }
}
