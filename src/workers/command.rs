//! The text command grammar workers accept.
//!
//! Commands are a comma-separated head plus `key: value` qualifiers:
//!
//! ```text
//! list repositories[, organization: cortside][, topic: api]
//! analyze repository: owner/repo[, branch: main]
//! map dependencies: owner/repo
//! ```
//!
//! Anything that doesn't parse becomes [`WorkerCommand::Freeform`] — workers
//! accept exploratory messages rather than rejecting strict-format misses.

/// A parsed worker command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerCommand {
    /// List known repositories, optionally filtered.
    ListRepositories {
        /// Restrict to one organization.
        organization: Option<String>,
        /// Restrict to one topic tag.
        topic: Option<String>,
    },
    /// Analyze one repository.
    AnalyzeRepository {
        /// Repository owner.
        owner: String,
        /// Repository name.
        name: String,
        /// Branch to analyze; the default branch when absent.
        branch: Option<String>,
    },
    /// Map a repository's dependency relationships.
    MapDependencies {
        /// Repository owner.
        owner: String,
        /// Repository name.
        name: String,
    },
    /// Anything the grammar didn't match.
    Freeform {
        /// The raw message text.
        text: String,
    },
}

/// Parse a command from message text.
pub fn parse_command(input: &str) -> WorkerCommand {
    let trimmed = input.trim();

    if let Some(rest) = strip_prefix_ci(trimmed, "list repositories") {
        let qualifiers = parse_qualifiers(rest);
        return WorkerCommand::ListRepositories {
            organization: qualifiers.get("organization").cloned(),
            topic: qualifiers.get("topic").cloned(),
        };
    }

    if let Some(rest) = strip_prefix_ci(trimmed, "analyze repository:") {
        let (slug, qualifiers) = split_head(rest);
        if let Some((owner, name)) = parse_slug(&slug) {
            return WorkerCommand::AnalyzeRepository {
                owner,
                name,
                branch: qualifiers.get("branch").cloned(),
            };
        }
    }

    if let Some(rest) = strip_prefix_ci(trimmed, "map dependencies:") {
        let (slug, _) = split_head(rest);
        if let Some((owner, name)) = parse_slug(&slug) {
            return WorkerCommand::MapDependencies { owner, name };
        }
    }

    WorkerCommand::Freeform {
        text: trimmed.to_string(),
    }
}

/// Scan freeform text for the first `owner/name` token. Lets workers honor
/// exploratory messages like "tell me about octo/site".
pub fn find_repository_slug(text: &str) -> Option<(String, String)> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric() && c != '/' && c != '-' && c != '_' && c != '.'))
        .find_map(parse_slug)
}

fn strip_prefix_ci<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&input[prefix.len()..])
    } else {
        None
    }
}

/// Split "head, key: value, ..." into the head and its qualifier map.
fn split_head(rest: &str) -> (String, std::collections::HashMap<String, String>) {
    let mut segments = rest.split(',');
    let head = segments.next().unwrap_or("").trim().to_string();
    let qualifiers = collect_qualifiers(segments);
    (head, qualifiers)
}

fn parse_qualifiers(rest: &str) -> std::collections::HashMap<String, String> {
    collect_qualifiers(rest.split(',').skip_while(|s| s.trim().is_empty()))
}

fn collect_qualifiers<'a>(
    segments: impl Iterator<Item = &'a str>,
) -> std::collections::HashMap<String, String> {
    segments
        .filter_map(|segment| {
            let (key, value) = segment.split_once(':')?;
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if key.is_empty() || value.is_empty() {
                None
            } else {
                Some((key, value.to_string()))
            }
        })
        .collect()
}

fn parse_slug(slug: impl AsRef<str>) -> Option<(String, String)> {
    let slug = slug.as_ref().trim();
    let (owner, name) = slug.split_once('/')?;
    let owner = owner.trim();
    let name = name.trim();
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return None;
    }
    Some((owner.to_string(), name.to_string()))
}
