use serde::Deserialize;

/// One page of a remote listing
#[derive(Debug, Clone)]
pub struct RemotePage<T> {
    pub items: Vec<T>,
    /// Continuation token; `None` on the last page
    pub next_cursor: Option<String>,
}

impl<T> RemotePage<T> {
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self {
            items,
            next_cursor: next_cursor.filter(|c| !c.is_empty()),
        }
    }
}

/// Optional capabilities of a directory backend, fixed at construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Backend can call the edge `client.userBoot` method
    pub edge_bootstrap: bool,
}

/// IM entry from the client bootstrap payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BootstrapIm {
    pub id: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub is_shared: bool,
    #[serde(default)]
    pub is_ext_shared: bool,
}

/// Subset of `client.userBoot` used for Slack Connect discovery
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientBootstrap {
    #[serde(default)]
    pub ims: Vec<BootstrapIm>,
}

impl ClientBootstrap {
    /// Counterparts of shared or externally shared IMs
    pub fn shared_im_users(&self) -> impl Iterator<Item = &str> {
        self.ims
            .iter()
            .filter(|im| im.is_shared || im.is_ext_shared)
            .filter_map(|im| im.user.as_deref())
    }
}

/// Bot metadata from `bots.info`
#[derive(Debug, Clone, Deserialize)]
pub struct BotInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cursor_ends_paging() {
        let page = RemotePage::new(vec![1, 2], Some(String::new()));
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_shared_im_users() {
        let boot: ClientBootstrap = serde_json::from_str(
            r#"{"ims":[
                {"id":"D1","user":"U1"},
                {"id":"D2","user":"W2","is_ext_shared":true},
                {"id":"D3","user":"W3","is_shared":true},
                {"id":"D4","is_ext_shared":true}
            ]}"#,
        )
        .unwrap();

        let users: Vec<&str> = boot.shared_im_users().collect();
        assert_eq!(users, vec!["W2", "W3"]);
    }
}
