//! Prompt text sent to the reasoning service. Versioned as code.

const SYSTEM_PROMPT: &str = "You are a senior DevOps engineer diagnosing CI/CD, Docker, Kubernetes, and backend system logs.

Your responsibilities:
1. Identify the type of error and categorize it appropriately
2. Determine the severity (Low, Medium, High) based on impact
3. Provide a clear, concise root cause analysis
4. Suggest specific, actionable remediation steps
5. Recommend prevention strategies for the future

Guidelines:
- Be specific and technical in your analysis
- Focus on actionable insights, not general advice
- Consider common DevOps patterns and anti-patterns
- Reference specific technologies when applicable
- Severity levels:
  - High: Production outages, security vulnerabilities, data loss risks
  - Medium: Performance degradation, partial failures, deprecated usage
  - Low: Warnings, style issues, minor configuration problems

CRITICAL: You MUST respond with ONLY valid JSON matching the exact schema provided. No markdown, no explanations, just the JSON object.";

const USER_TEMPLATE: &str = r#"Analyze the following log and return valid JSON exactly matching this schema:
{
  "error_type": "string - category of the error (e.g., 'docker_build_failure', 'permission_denied', 'connection_timeout')",
  "severity": "Low|Medium|High",
  "root_cause": "string - concise explanation of why this error occurred",
  "suggested_actions": ["string array - specific steps to fix the issue"],
  "prevention_tips": ["string array - how to prevent this in the future"]
}

Log content:
---
{log}
---

Respond with ONLY the JSON object, no additional text."#;

const LOG_PLACEHOLDER: &str = "{log}";

#[derive(Debug, Clone)]
pub struct PromptBuilder {
  system: String,
  user_template: String,
}

impl Default for PromptBuilder {
  fn default() -> Self {
    Self {
      system: SYSTEM_PROMPT.into(),
      user_template: USER_TEMPLATE.into(),
    }
  }
}

impl PromptBuilder {
  /// `user_template` should contain a `{log}` placeholder.
  pub fn custom(system: impl Into<String>, user_template: impl Into<String>) -> Self {
    Self {
      system: system.into(),
      user_template: user_template.into(),
    }
  }

  pub fn system_prompt(&self) -> &str {
    &self.system
  }

  pub fn user_prompt(&self, log: &str) -> String {
    if !self.user_template.contains(LOG_PLACEHOLDER) {
      return format!("Analyze this log:\n\n{}", log);
    }
    self.user_template.replacen(LOG_PLACEHOLDER, log, 1)
  }
}
