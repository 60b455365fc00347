mod lifecycle;
mod mode;
mod set;
mod shell;
mod status;

use idc_core::{AppContext, KeyValueStore, state};

pub use lifecycle::lifecycle;
pub use mode::set_mode;
pub use set::set;
pub use shell::shell;
pub use status::status_tracker;

/// Elevation password: `IDC_ROOT_PASSWORD`, else the global store.
pub(crate) fn root_password<F>(ctx: &AppContext, lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup("IDC_ROOT_PASSWORD")
        .filter(|p| !p.is_empty())
        .or_else(|| {
            KeyValueStore::open_global(&ctx.global_dir)
                .get(state::ROOT_PASSWORD)
                .map(str::to_owned)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use idc_core::{AppIdentity, IdcConfig, PathsConfig};
    use tempfile::TempDir;

    /// Context for `<tmp>/<app>` with every store rooted under `tmp`.
    fn context(tmp: &TempDir, app: &str) -> AppContext {
        let dir = tmp.path().join(app);
        let config = IdcConfig {
            paths: PathsConfig {
                state_dir: Some(dir.join(".idc")),
                global_dir: Some(tmp.path().join("home/.idc")),
                ..PathsConfig::default()
            },
            ..IdcConfig::default()
        };
        AppContext::new(AppIdentity::from_resolved_dir(&dir, ""), config)
    }

    #[test]
    fn root_password_prefers_environment() {
        let tmp = TempDir::new().unwrap();
        let ctx = context(&tmp, "shop");
        let mut global = KeyValueStore::open_global(&ctx.global_dir);
        global.set(state::ROOT_PASSWORD, "stored").unwrap();

        let from_env = root_password(&ctx, |_| Some("from-env".to_owned()));
        assert_eq!(from_env.as_deref(), Some("from-env"));

        let from_store = root_password(&ctx, |_| None);
        assert_eq!(from_store.as_deref(), Some("stored"));
    }

    #[test]
    fn root_password_is_shared_between_applications() {
        let tmp = TempDir::new().unwrap();
        let shop = context(&tmp, "shop");
        let blog = context(&tmp, "blog");
        KeyValueStore::open_global(&shop.global_dir)
            .set(state::ROOT_PASSWORD, "pw")
            .unwrap();

        assert_ne!(shop.state_dir, blog.state_dir);
        assert_eq!(root_password(&blog, |_| None).as_deref(), Some("pw"));
    }

    #[test]
    fn root_password_absent_everywhere() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(root_password(&context(&tmp, "shop"), |_| None), None);
    }
}
