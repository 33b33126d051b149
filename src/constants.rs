//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! All magic numbers should be defined here with documentation.

/// Application identity
pub mod app {
    pub const NAME: &str = "Baker Street Laboratory";

    /// Attribution line printed in generated reports
    pub const PIPELINE_NAME: &str = "Baker Street Laboratory Research Pipeline";

    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Environment variable prefix for configuration overrides
    pub const ENV_PREFIX: &str = "BAKERSTREET_";
}

/// Research pipeline constants
pub mod research {
    /// Default directory for report artifacts
    pub const DEFAULT_OUTPUT_DIR: &str = "research";

    /// Phrase that selects the featured report template
    pub const FEATURED_TOPIC: &str = "meaning of life";

    /// Query run by the `pipeline` command
    pub const SAMPLE_QUERY: &str = "Latest developments in AI research";

    /// Report file name prefix; full name is `research_report_<session_id>.md`
    pub const REPORT_PREFIX: &str = "research_report_";

    pub const REPORT_EXTENSION: &str = "md";

    /// Source categories every plan expects to draw from
    pub const EXPECTED_SOURCES: [&str; 4] = ["academic", "web", "books", "reports"];
}

/// LLM provider constants
pub mod llm {
    pub const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";
    pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:latest";

    pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
    pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

    /// Maximum characters of source material embedded in one prompt
    pub const MAX_PROMPT_MATERIAL_CHARS: usize = 12_000;
}

/// Data source constants
pub mod sources {
    pub const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";
    pub const ARXIV_API: &str = "https://export.arxiv.org/api/query";
    pub const NEWS_API: &str = "https://newsapi.org/v2/everything";

    /// News API rejects page sizes above this
    pub const NEWS_MAX_PAGE_SIZE: usize = 20;

    /// Snippets longer than this are truncated with an ellipsis
    pub const SNIPPET_MAX_CHARS: usize = 500;

    /// User agent sent to public APIs
    pub const USER_AGENT: &str = concat!("bakerstreet/", env!("CARGO_PKG_VERSION"));
}

/// Network constants
pub mod network {
    /// Default HTTP request timeout for data sources (seconds)
    pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

    /// Maximum accepted request body for the API (bytes)
    pub const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;
}
