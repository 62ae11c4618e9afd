use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use client_core::{settled, ActionSlot, ActionState, WalletClient};
use serde::Serialize;
use soft_device::SoftDevice;

/// Unsigned legacy transfer, RLP-encoded. The soft signer never parses it;
/// it only has to decode as hex.
const EXAMPLE_RAW_TRANSACTION_HEX: &str =
    "0xeb808504e3b2920082520894aabbccddeeff00112233445566778899aabbccdd87038d7ea4c68000808080";

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "44'/60'/0'/0")]
    derivation_path: String,
    #[arg(long, default_value = EXAMPLE_RAW_TRANSACTION_HEX)]
    raw_tx_hex: String,
    /// Simulate a device whose owner never enters the PIN.
    #[arg(long)]
    locked: bool,
    #[arg(long)]
    install_app: Option<String>,
    #[arg(long)]
    uninstall_app: Option<String>,
}

async fn wait_and_print<O>(label: &str, slot: &ActionSlot<O>) -> Result<()>
where
    O: Serialize + Clone + Send + Sync + std::fmt::Debug + 'static,
{
    let mut rx = slot.subscribe();
    match settled(&mut rx).await {
        ActionState::Completed(output) => {
            println!("{label}: {}", serde_json::to_string_pretty(&output)?);
        }
        ActionState::Failed(error) => println!("{label} failed: {error}"),
        other => println!("{label}: {other:?}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let device = Arc::new(if args.locked {
        SoftDevice::locked()
    } else {
        SoftDevice::new()
    });
    let client = WalletClient::new_with_providers(device.clone(), device.clone(), device);

    client.connect_first_device();
    wait_and_print("connect", client.connect_action()).await?;
    let Some(session) = client.session_id() else {
        anyhow::bail!("no device session; nothing else to demo");
    };
    println!("session: {session}");

    let mut states = client.subscribe_session_state();
    if states.borrow_and_update().is_none() {
        states.changed().await?;
    }
    println!(
        "session state: {}",
        serde_json::to_string(&client.session_state())?
    );

    client.derive_address(&args.derivation_path);
    wait_and_print("get_address", client.address_action()).await?;

    client.sign_transaction(&args.derivation_path, &args.raw_tx_hex);
    wait_and_print("sign_transaction", client.signature_action()).await?;

    if let Some(app_name) = &args.install_app {
        client.install_app(app_name);
        wait_and_print("install_app", client.install_app_action()).await?;
    }
    if let Some(app_name) = &args.uninstall_app {
        client.uninstall_app(app_name);
        wait_and_print("uninstall_app", client.uninstall_app_action()).await?;
    }

    client.disconnect().await?;
    println!("disconnected");
    Ok(())
}
