// ABOUTME: Demo application that sends one SMS through the gateway and waits for its outcome
// ABOUTME: Prints the submit_sm_resp verdict and, if requested, the final delivery receipt

use argh::FromArgs;
use smpp_gateway::client::{BindCredentials, GatewayBuilder, SmscId};
use std::error::Error;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Send an SMS through an SMPP transceiver session
#[derive(FromArgs)]
struct CliArgs {
    /// log protocol traffic at debug level
    #[argh(switch, short = 'd')]
    debug: bool,

    /// the system id
    #[argh(option)]
    system_id: Option<String>,

    /// the password
    #[argh(option)]
    password: Option<String>,

    /// the hostname or IP address of the SMSC (default: localhost)
    #[argh(option)]
    host: Option<String>,

    /// the port to use when connecting to the SMSC (default: 2775)
    #[argh(option, short = 'p')]
    port: Option<u16>,

    /// submissions per second (default: 10)
    #[argh(option, default = "10")]
    tps: u32,

    /// the id reported back with the SMSC's verdict (default: 1)
    #[argh(option, default = "1")]
    id: u32,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,

    /// the recipient telephone number
    #[argh(option, short = 't')]
    to: String,

    /// the sender shown on the handset
    #[argh(option, short = 'f')]
    from: String,

    /// seconds to wait for the delivery receipt after the SMSC accepts
    #[argh(option, default = "0")]
    receipt_wait: u64,
}

enum Outcome {
    Submitted { status: u32, smsc_id: String },
    Delivered { smsc_id: String, status: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let level = if cli_args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let host = cli_args.host.unwrap_or_else(|| "localhost".to_owned());
    let port = cli_args.port.unwrap_or(2775);
    let credentials = BindCredentials::transceiver(
        cli_args.system_id.unwrap_or_default(),
        cli_args.password.unwrap_or_default(),
    );

    let (tx, mut outcomes) = mpsc::unbounded_channel();
    let delivered = tx.clone();

    let mut gateway = GatewayBuilder::new(host, port, credentials)
        .tps(cli_args.tps)
        .on_submit_response(move |_, status, smsc_id| {
            let _ = tx.send(Outcome::Submitted { status, smsc_id });
        })
        .on_delivery(move |smsc_id, status| {
            let _ = delivered.send(Outcome::Delivered { smsc_id, status });
        })
        .build()?;

    gateway.start().await.map_err(|e| {
        eprintln!("Connection/bind failed: {e}");
        e
    })?;
    println!("Connected and bound successfully");

    gateway
        .send(cli_args.id, cli_args.from, cli_args.to, cli_args.message)
        .await?;

    let accepted_id = loop {
        match tokio::time::timeout(Duration::from_secs(30), outcomes.recv()).await {
            Ok(Some(Outcome::Submitted { status: 0, smsc_id })) => {
                println!("Message accepted, SMSC id {smsc_id}");
                break SmscId::new(smsc_id).to_decimal();
            }
            Ok(Some(Outcome::Submitted { status, .. })) => {
                return Err(format!("SMSC rejected the message with status {status:#010x}").into());
            }
            Ok(Some(Outcome::Delivered { .. })) => continue,
            Ok(None) | Err(_) => return Err("no submit_sm_resp from SMSC".into()),
        }
    };

    if cli_args.receipt_wait == 0 {
        return Ok(());
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(cli_args.receipt_wait);
    while let Ok(Some(outcome)) = tokio::time::timeout_at(deadline, outcomes.recv()).await {
        if let Outcome::Delivered { smsc_id, status } = outcome {
            // Some SMSCs answer in hex and report receipts in decimal
            if SmscId::new(smsc_id.as_str()).to_decimal() == accepted_id {
                println!("Delivery receipt: {status}");
                return Ok(());
            }
            println!("Receipt for another message ({smsc_id}): {status}");
        }
    }

    println!("No delivery receipt within {}s", cli_args.receipt_wait);
    Ok(())
}
