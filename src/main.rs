use clap::Parser;
use vcn_shop::env::{Env, setup_tracing};
use vcn_shop::launch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv_override().ok();

    let env = Env::try_parse()?;
    setup_tracing(&env);

    launch(env).await
}
