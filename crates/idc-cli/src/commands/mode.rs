use idc_core::state::{self, StartMode};
use idc_core::{AppContext, KeyValueStore};

pub fn set_mode(ctx: &AppContext, mode: StartMode) -> anyhow::Result<()> {
    let mut store = KeyValueStore::open(&ctx.state_dir, &ctx.app.id);
    store.set(state::START_MODE, mode.as_str())?;

    println!("{} will start in {} mode", ctx.app.name, mode.as_str());
    Ok(())
}
