//! Route table.

use std::fmt;

/// A navigable view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`, which always forwards to the runbook list.
    Root,
    /// `/login`, optionally carrying the path to return to afterwards.
    Login { redirect: Option<String> },
    /// `/runbooks`
    Runbooks,
    /// `/runbook/{filename}`
    Runbook { filename: String },
}

impl Route {
    /// Route name as shown to users.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Root => "Root",
            Self::Login { .. } => "Login",
            Self::Runbooks => "Runbooks",
            Self::Runbook { .. } => "RunbookViewer",
        }
    }

    /// Whether entering this view needs an authenticated session.
    pub const fn requires_auth(&self) -> bool {
        matches!(self, Self::Runbooks | Self::Runbook { .. })
    }

    /// Path for this route, with path segments and query values escaped.
    pub fn path(&self) -> String {
        match self {
            Self::Root => "/".to_string(),
            Self::Login { redirect: None } => "/login".to_string(),
            Self::Login {
                redirect: Some(redirect),
            } => format!("/login?redirect={}", urlencoding::encode(redirect)),
            Self::Runbooks => "/runbooks".to_string(),
            Self::Runbook { filename } => format!("/runbook/{}", urlencoding::encode(filename)),
        }
    }

    /// Parse a path produced by [`Route::path`] (or typed by a user).
    pub fn parse(path: &str) -> Option<Self> {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        let path = path.trim_end_matches('/');

        match path {
            "" => Some(Self::Root),
            "/runbooks" => Some(Self::Runbooks),
            "/login" => Some(Self::Login {
                redirect: query_param(query, "redirect"),
            }),
            _ => {
                let raw = path.strip_prefix("/runbook/")?;
                if raw.is_empty() || raw.contains('/') {
                    return None;
                }
                let filename = urlencoding::decode(raw).ok()?.into_owned();
                Some(Self::Runbook { filename })
            }
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_paths() {
        assert_eq!(Route::parse("/"), Some(Route::Root));
        assert_eq!(Route::parse(""), Some(Route::Root));
        assert_eq!(Route::parse("/runbooks"), Some(Route::Runbooks));
        assert_eq!(Route::parse("/runbooks/"), Some(Route::Runbooks));
        assert_eq!(
            Route::parse("/runbook/deploy.md"),
            Some(Route::Runbook {
                filename: "deploy.md".to_string()
            })
        );
        assert_eq!(Route::parse("/login"), Some(Route::Login { redirect: None }));
        assert_eq!(Route::parse("/settings"), None);
        assert_eq!(Route::parse("/runbook/"), None);
    }

    #[test]
    fn test_login_redirect_roundtrip() {
        let target = Route::Runbook {
            filename: "ops guide.md".to_string(),
        };
        let login = Route::Login {
            redirect: Some(target.path()),
        };
        assert_eq!(login.path(), "/login?redirect=%2Frunbook%2Fops%2520guide.md");

        let Some(Route::Login {
            redirect: Some(redirect),
        }) = Route::parse(&login.path())
        else {
            panic!("expected login route with redirect");
        };
        assert_eq!(Route::parse(&redirect), Some(target));
    }

    #[test]
    fn test_requires_auth() {
        assert!(Route::Runbooks.requires_auth());
        assert!(Route::Runbook {
            filename: "a.md".to_string()
        }
        .requires_auth());
        assert!(!Route::Login { redirect: None }.requires_auth());
        assert!(!Route::Root.requires_auth());
    }
}
