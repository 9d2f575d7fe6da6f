use anyhow::Context;
use clap::{Parser, ValueEnum};
use wslpg_client::app::scenarios::Homologacion;
use wslpg_client::utils::{logger, validation::Validate};
use wslpg_client::{ClientConfig, LocalStorage, OpensslSigner, WsaaClient, WslpgClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Escenario {
    Liquidacion,
    Anulacion,
    AjusteUnificado,
    AjusteContrato,
    AjustePapel,
}

#[derive(Parser)]
#[command(name = "homologacion")]
#[command(about = "Runs the settlement scenarios against the homologation service")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "wslpg.toml")]
    config: String,

    /// Scenarios to run (all by default)
    #[arg(long, value_enum, value_delimiter = ',')]
    escenarios: Vec<Escenario>,

    /// Enable verbose output (SOAP bodies with RUST_LOG=wslpg_client=trace)
    #[arg(short, long)]
    verbose: bool,
}

async fn run_one(script: &Homologacion<'_>, escenario: Escenario) -> anyhow::Result<String> {
    let summary = match escenario {
        Escenario::Liquidacion => {
            let r = script.liquidacion().await?;
            format!("COE {}", r.coe)
        }
        Escenario::Anulacion => {
            let r = script.anulacion().await?;
            format!("COE {} resultado {}", r.coe, r.resultado)
        }
        Escenario::AjusteUnificado => {
            let r = script.ajuste_unificado().await?;
            format!("COE {} subtotal {}", r.coe, r.totales.subtotal_general)
        }
        Escenario::AjusteContrato => {
            let r = script.ajuste_contrato().await?;
            format!("COE {}", r.coe)
        }
        Escenario::AjustePapel => {
            let r = script.ajuste_papel().await?;
            format!("COE {}", r.coe)
        }
    };
    Ok(summary)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = ClientConfig::from_file(&args.config)
        .with_context(|| format!("loading {}", args.config))?;
    config.validate()?;

    // 認證
    let storage = LocalStorage::new(config.cache_dir().to_string());
    let signer = OpensslSigner::new(
        config.auth.openssl_bin(),
        &config.auth.cert,
        &config.auth.private_key,
    );
    let wsaa = WsaaClient::from_config(&config.auth, storage, signer);
    let ticket = wsaa
        .authenticate(config.auth.service())
        .await
        .context("authenticating against WSAA")?;

    let client = WslpgClient::connect(&config.wslpg)?.with_auth(&ticket, config.auth.cuit);
    let script = Homologacion::new(&client, config.auth.cuit);

    let escenarios = if args.escenarios.is_empty() {
        vec![
            Escenario::Liquidacion,
            Escenario::Anulacion,
            Escenario::AjusteUnificado,
            Escenario::AjusteContrato,
            Escenario::AjustePapel,
        ]
    } else {
        args.escenarios.clone()
    };

    let mut failures = 0;
    for escenario in escenarios {
        match run_one(&script, escenario).await {
            Ok(summary) => println!("✅ {:?}: {}", escenario, summary),
            Err(e) => {
                failures += 1;
                println!("❌ {:?}: {:#}", escenario, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} scenario(s) failed", failures);
    }
    Ok(())
}
