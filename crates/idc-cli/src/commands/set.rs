use idc_core::state::{self, SettingScope};
use idc_core::store::NULL_SENTINEL;
use idc_core::{AppContext, Error, KeyValueStore};

/// Store one `KEY=VALUE` setting in the store its key belongs to.
pub fn set(ctx: &AppContext, key_value: &str) -> anyhow::Result<()> {
    let (key, value) = parse_setting(key_value)?;
    let scope = state::setting_scope(key).ok_or_else(|| Error::InvalidSetting {
        name: "set",
        value: key.to_owned(),
        reason: "unknown key; expected root-password, debug-port or workspace-origin",
    })?;

    if key == state::DEBUG_PORT && value != NULL_SENTINEL && value.parse::<u16>().is_err() {
        return Err(Error::InvalidSetting {
            name: state::DEBUG_PORT,
            value: value.to_owned(),
            reason: "expected a port number",
        }
        .into());
    }

    let mut store = match scope {
        SettingScope::App => KeyValueStore::open(&ctx.state_dir, &ctx.app.id),
        SettingScope::Global => KeyValueStore::open_global(&ctx.global_dir),
    };
    store.put(key, Some(value))?;

    if value == NULL_SENTINEL {
        println!("{key} removed");
    } else if key == state::ROOT_PASSWORD {
        println!("{key} set");
    } else {
        println!("{key} set to {value}");
    }
    Ok(())
}

fn parse_setting(key_value: &str) -> Result<(&str, &str), Error> {
    match key_value.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(Error::InvalidSetting {
            name: "set",
            value: key_value.to_owned(),
            reason: "expected KEY=VALUE",
        }),
    }
}
