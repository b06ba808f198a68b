//! Immutable pre-classification rules and the built-in rule table.

use std::collections::HashSet;

use regex::Regex;

use crate::error::AnalyzerError;
use crate::types::{AnalysisResult, Severity};
use crate::validate::{ResponseValidator, SchemaValidator};

/// One compiled rule. Matching is a pure predicate; nothing here mutates.
#[derive(Debug, Clone)]
pub struct Rule {
  pub id: String,
  pub name: String,
  pub description: String,
  /// Stored lowercase.
  keywords: Vec<String>,
  patterns: Vec<Regex>,
  pub confidence: f64,
  pub result: AnalysisResult,
}

impl Rule {
  pub fn new(
    id: impl Into<String>,
    keywords: Vec<String>,
    patterns: Vec<Regex>,
    confidence: f64,
    result: AnalysisResult,
  ) -> Self {
    let id = id.into();
    Self {
      name: id.clone(),
      description: String::new(),
      id,
      keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
      patterns,
      confidence,
      result,
    }
  }

  fn from_spec(spec: &RuleSpec) -> Result<Self, AnalyzerError> {
    let patterns = spec
      .patterns
      .iter()
      .map(|p| {
        Regex::new(p).map_err(|e| {
          AnalyzerError::invalid_config(format!("rule {}: bad pattern {:?}: {}", spec.id, p, e))
        })
      })
      .collect::<Result<Vec<_>, _>>()?;

    let mut rule = Rule::new(
      spec.id,
      spec.keywords.iter().map(|k| k.to_string()).collect(),
      patterns,
      spec.confidence,
      AnalysisResult {
        error_type: spec.error_type.into(),
        severity: spec.severity,
        root_cause: spec.root_cause.into(),
        suggested_actions: spec.suggested_actions.iter().map(|s| s.to_string()).collect(),
        prevention_tips: spec.prevention_tips.iter().map(|s| s.to_string()).collect(),
      },
    );
    rule.name = spec.name.into();
    rule.description = spec.description.into();
    Ok(rule)
  }

  /// Any keyword (case-insensitive substring) or any pattern anywhere in the text.
  pub fn matches(&self, log: &str) -> bool {
    self.matches_prepared(log, &log.to_lowercase())
  }

  /// Same as [`Rule::matches`] with the lowercase copy computed once by the caller.
  pub(crate) fn matches_prepared(&self, log: &str, log_lower: &str) -> bool {
    // Keywords first: a substring scan is cheaper than a regex.
    self.keywords.iter().any(|kw| log_lower.contains(kw.as_str()))
      || self.patterns.iter().any(|p| p.is_match(log))
  }
}

/// Ordered, read-only rule set built once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct RuleTable {
  rules: Vec<Rule>,
}

impl RuleTable {
  /// Rejects empty or duplicate ids, confidences outside [0, 1] and results
  /// that fail the schema.
  pub fn new(rules: Vec<Rule>) -> Result<Self, AnalyzerError> {
    let mut seen = HashSet::new();
    for rule in &rules {
      if rule.id.trim().is_empty() {
        return Err(AnalyzerError::invalid_config("rule id is empty"));
      }
      if !seen.insert(rule.id.as_str()) {
        return Err(AnalyzerError::invalid_config(format!("duplicate rule id: {}", rule.id)));
      }
      if !(0.0..=1.0).contains(&rule.confidence) {
        return Err(AnalyzerError::invalid_config(format!(
          "rule {}: confidence {} outside [0, 1]",
          rule.id, rule.confidence
        )));
      }
      SchemaValidator
        .validate(Some(&rule.result))
        .map_err(|e| AnalyzerError::invalid_config(format!("rule {}: {}", rule.id, e)))?;
    }
    Ok(Self { rules })
  }

  pub fn builtin() -> Result<Self, AnalyzerError> {
    let rules = BUILTIN_RULES
      .iter()
      .map(Rule::from_spec)
      .collect::<Result<Vec<_>, _>>()?;
    Self::new(rules)
  }

  pub fn rules(&self) -> &[Rule] {
    &self.rules
  }

  pub fn get(&self, id: &str) -> Option<&Rule> {
    self.rules.iter().find(|r| r.id == id)
  }

  pub fn len(&self) -> usize {
    self.rules.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rules.is_empty()
  }
}

// ---------------------------------------------------------------------------
// Built-in rules
// ---------------------------------------------------------------------------

struct RuleSpec {
  id: &'static str,
  name: &'static str,
  description: &'static str,
  keywords: &'static [&'static str],
  patterns: &'static [&'static str],
  confidence: f64,
  error_type: &'static str,
  severity: Severity,
  root_cause: &'static str,
  suggested_actions: &'static [&'static str],
  prevention_tips: &'static [&'static str],
}

const BUILTIN_RULES: &[RuleSpec] = &[
  RuleSpec {
    id: "docker_build_permission",
    name: "Docker Build Permission Denied",
    description: "Docker build failures due to permission issues",
    keywords: &["docker build", "permission denied"],
    patterns: &[r"(?i)docker.*build.*permission\s+denied", r"(?i)error.*docker.*EACCES"],
    confidence: 0.9,
    error_type: "docker_permission_denied",
    severity: Severity::High,
    root_cause: "Docker build failed due to insufficient permissions. This typically occurs when the user running Docker doesn't have access to required files or the Docker socket.",
    suggested_actions: &[
      "Ensure the user is in the 'docker' group: sudo usermod -aG docker $USER",
      "Check file permissions in the build context",
      "If using CI/CD, ensure the runner has Docker socket access",
      "Verify Dockerfile COPY/ADD commands reference accessible files",
    ],
    prevention_tips: &[
      "Run Docker with appropriate user permissions",
      "Use multi-stage builds with proper ownership",
      "Configure CI/CD runners with Docker access",
    ],
  },
  RuleSpec {
    id: "docker_daemon_not_running",
    name: "Docker Daemon Not Running",
    description: "Docker daemon is not available",
    keywords: &["cannot connect to the docker daemon", "docker daemon is not running"],
    patterns: &[
      r"(?i)cannot connect to the docker daemon",
      r"(?i)is the docker daemon running",
      r"(?i)docker\.sock.*no such file",
    ],
    confidence: 0.95,
    error_type: "docker_daemon_unavailable",
    severity: Severity::High,
    root_cause: "The Docker daemon is not running or not accessible. Docker commands require a running daemon to execute.",
    suggested_actions: &[
      "Start the Docker daemon: sudo systemctl start docker",
      "Check Docker service status: sudo systemctl status docker",
      "Verify Docker installation: docker --version",
      "If using Docker Desktop, ensure the application is running",
    ],
    prevention_tips: &[
      "Enable Docker to start on boot: sudo systemctl enable docker",
      "Monitor Docker daemon health in production",
      "Use Docker healthchecks in CI/CD pipelines",
    ],
  },
  RuleSpec {
    id: "npm_install_failure",
    name: "NPM Install Failure",
    description: "npm install failures",
    keywords: &["npm err!"],
    patterns: &[
      r"(?i)npm ERR!.*code\s+E[A-Z]+",
      r"(?i)npm ERR!.*404.*not found",
      r"(?i)npm ERR!.*peer dep",
    ],
    confidence: 0.85,
    error_type: "npm_install_failure",
    severity: Severity::Medium,
    root_cause: "NPM package installation failed. This could be due to missing packages, version conflicts, network issues, or corrupted cache.",
    suggested_actions: &[
      "Clear npm cache: npm cache clean --force",
      "Delete node_modules and package-lock.json, then reinstall",
      "Check if the package exists and version is correct",
      "Verify network connectivity to npm registry",
      "Check for peer dependency conflicts",
    ],
    prevention_tips: &[
      "Lock dependency versions in package-lock.json",
      "Use npm ci in CI/CD for reproducible builds",
      "Regularly update dependencies to avoid conflicts",
    ],
  },
  RuleSpec {
    id: "out_of_memory",
    name: "Out of Memory",
    description: "Out of memory errors",
    keywords: &["out of memory", "oomkilled", "memory allocation failed", "heap out of memory"],
    patterns: &[
      r"(?i)out\s+of\s+memory",
      r"(?i)OOMKilled",
      r"(?i)Cannot allocate memory",
      r"(?i)JavaScript heap out of memory",
      r"(?i)java\.lang\.OutOfMemoryError",
    ],
    confidence: 0.95,
    error_type: "out_of_memory",
    severity: Severity::High,
    root_cause: "The process exhausted available memory and was terminated. This can be caused by memory leaks, insufficient resource limits, or processing large datasets.",
    suggested_actions: &[
      "Increase memory limits for the container/process",
      "Profile the application for memory leaks",
      "Implement pagination for large data processing",
      "Check for unbounded caches or collections",
      "Review Kubernetes resource limits",
    ],
    prevention_tips: &[
      "Set appropriate memory limits based on profiling",
      "Implement memory monitoring and alerting",
      "Use streaming for large file processing",
      "Regular load testing with realistic data volumes",
    ],
  },
  RuleSpec {
    id: "connection_timeout",
    name: "Connection Timeout",
    description: "Network-level connection timeout errors",
    keywords: &["connection timed out", "etimedout", "connection refused", "dial tcp"],
    patterns: &[
      r"(?i)connection\s+timed?\s*out",
      r"(?i)ETIMEDOUT",
      r"(?i)ECONNREFUSED",
      r"(?i)dial tcp.*timeout",
      r"(?i)i/o timeout",
      r"(?i)connect:.*timeout",
    ],
    confidence: 0.85,
    error_type: "connection_timeout",
    severity: Severity::Medium,
    root_cause: "A network connection attempt timed out. This could indicate the target service is down, network issues, firewall blocking, or incorrect host/port configuration.",
    suggested_actions: &[
      "Verify the target service is running and healthy",
      "Check network connectivity: ping, telnet, curl",
      "Review firewall rules and security groups",
      "Verify the host and port configuration",
      "Check DNS resolution",
    ],
    prevention_tips: &[
      "Implement health checks for dependencies",
      "Use circuit breakers for external services",
      "Configure appropriate timeout values",
      "Add retry logic with exponential backoff",
    ],
  },
  RuleSpec {
    id: "ssl_certificate_error",
    name: "SSL Certificate Error",
    description: "SSL/TLS certificate issues",
    keywords: &["certificate verify failed", "certificate expired"],
    patterns: &[
      r"(?i)certificate\s+verify\s+failed",
      r"(?i)SSL.*certificate.*expired",
      r"(?i)unable to verify the first certificate",
      r"(?i)self.signed certificate",
      r"(?i)x509.*certificate",
    ],
    confidence: 0.9,
    error_type: "ssl_certificate_error",
    severity: Severity::High,
    root_cause: "SSL/TLS certificate validation failed. The certificate may be expired, self-signed, issued by an untrusted CA, or the hostname doesn't match.",
    suggested_actions: &[
      "Check certificate expiration date",
      "Verify the certificate chain is complete",
      "Ensure the CA is trusted in the system's trust store",
      "Verify the hostname matches the certificate CN/SAN",
      "For internal services, add the CA to trusted certificates",
    ],
    prevention_tips: &[
      "Set up certificate expiration monitoring",
      "Use automated certificate renewal (Let's Encrypt)",
      "Implement certificate rotation procedures",
      "Document internal CA trust requirements",
    ],
  },
  RuleSpec {
    id: "disk_space_full",
    name: "Disk Space Full",
    description: "Disk space exhaustion",
    keywords: &["no space left on device", "disk full", "enospc"],
    patterns: &[
      r"(?i)no space left on device",
      r"(?i)ENOSPC",
      r"(?i)disk\s+quota\s+exceeded",
    ],
    confidence: 0.95,
    error_type: "disk_space_full",
    severity: Severity::High,
    root_cause: "The disk has run out of available space. This prevents writing new data and can cause application crashes or data corruption.",
    suggested_actions: &[
      "Identify large files: du -sh /* | sort -h",
      "Clean up Docker resources: docker system prune -a",
      "Remove old log files and temporary data",
      "Extend disk size if in cloud environment",
      "Check for log rotation configuration",
    ],
    prevention_tips: &[
      "Implement disk space monitoring with alerts",
      "Configure log rotation policies",
      "Set up automatic cleanup of temporary files",
      "Use separate volumes for logs and data",
    ],
  },
  RuleSpec {
    id: "port_in_use",
    name: "Port Already In Use",
    description: "Port binding conflicts",
    keywords: &["address already in use", "eaddrinuse", "port is already allocated"],
    patterns: &[
      r"(?i)address already in use",
      r"(?i)EADDRINUSE",
      r"(?i)bind.*port.*already",
      r"(?i)port\s+\d+.*is already allocated",
    ],
    confidence: 0.95,
    error_type: "port_already_in_use",
    severity: Severity::Medium,
    root_cause: "The application cannot bind to the specified port because another process is already using it.",
    suggested_actions: &[
      "Find the process using the port: lsof -i :<port> or netstat -tlnp",
      "Stop the conflicting process or service",
      "Configure the application to use a different port",
      "Check for zombie processes from previous runs",
    ],
    prevention_tips: &[
      "Use unique ports for each service",
      "Implement graceful shutdown to release ports",
      "Use port 0 for dynamic port allocation in tests",
      "Document port assignments in project documentation",
    ],
  },
  RuleSpec {
    id: "authentication_failure",
    name: "Authentication Failure",
    description: "Authentication and authorization failures",
    keywords: &["authentication failed", "unauthorized", "access denied", "invalid credentials"],
    patterns: &[
      r"(?i)authentication\s+failed",
      r"(?i)401\s+unauthorized",
      r"(?i)403\s+forbidden",
      r"(?i)invalid\s+(credentials|token|api.?key)",
      r"(?i)access\s+denied",
    ],
    confidence: 0.85,
    error_type: "authentication_failure",
    severity: Severity::High,
    root_cause: "Authentication or authorization failed. Credentials may be invalid, expired, or missing. The user/service may also lack required permissions.",
    suggested_actions: &[
      "Verify credentials are correct and not expired",
      "Check if API keys or tokens need renewal",
      "Verify the service account has required permissions",
      "Check for environment variable configuration issues",
      "Review IAM policies and role assignments",
    ],
    prevention_tips: &[
      "Use secret management systems (Vault, AWS Secrets Manager)",
      "Implement credential rotation policies",
      "Use service accounts with minimal required permissions",
      "Monitor for authentication failures in security logs",
    ],
  },
  RuleSpec {
    id: "k8s_image_pull_backoff",
    name: "Kubernetes Image Pull BackOff",
    description: "Kubernetes image pull failures",
    keywords: &["imagepullbackoff", "errimagepull", "failed to pull image"],
    patterns: &[
      r"(?i)ImagePullBackOff",
      r"(?i)ErrImagePull",
      r"(?i)failed to pull image",
      r"(?i)rpc error.*pulling image",
    ],
    confidence: 0.95,
    error_type: "kubernetes_image_pull_failure",
    severity: Severity::High,
    root_cause: "Kubernetes cannot pull the specified container image. This could be due to image not existing, registry authentication issues, network problems, or incorrect image name/tag.",
    suggested_actions: &[
      "Verify the image name and tag are correct",
      "Check if the image exists in the registry",
      "Verify imagePullSecrets are configured correctly",
      "Test registry connectivity from the cluster",
      "Check if the registry requires authentication",
    ],
    prevention_tips: &[
      "Use image digests instead of mutable tags",
      "Implement CI/CD checks for image availability",
      "Configure proper registry credentials in secrets",
      "Use a container registry with high availability",
    ],
  },
];
