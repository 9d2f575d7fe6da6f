use clap::Parser;
use serde::de::DeserializeOwned;
use wslpg_client::config::cli::{Command, TablaArg, TipoAjuste};
use wslpg_client::core::report::{self, OutputFormat};
use wslpg_client::domain::model::{Ajuste, LiquidacionRequest, Tabla};
use wslpg_client::utils::{logger, validation::Validate};
use wslpg_client::{
    ClientConfig, CliConfig, LocalStorage, OpensslSigner, Result, WsaaClient, WslpgClient,
    WslpgError,
};

fn load_request<T: DeserializeOwned>(path: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| WslpgError::ConfigValidationError {
        field: path.to_string(),
        message: format!("TOML parsing error: {}", e),
    })
}

async fn connect(cli: &CliConfig, config: &ClientConfig) -> Result<WslpgClient> {
    let client = WslpgClient::connect(&config.wslpg)?;
    if matches!(cli.command, Command::Dummy) {
        return Ok(client);
    }

    let storage = LocalStorage::new(config.cache_dir().to_string());
    let signer = OpensslSigner::new(
        config.auth.openssl_bin(),
        &config.auth.cert,
        &config.auth.private_key,
    );
    let wsaa = WsaaClient::from_config(&config.auth, storage, signer);
    let ticket = wsaa.authenticate(config.auth.service()).await?;

    Ok(client.with_auth(&ticket, config.auth.cuit))
}

async fn run(cli: &CliConfig, config: &ClientConfig) -> Result<String> {
    let format: OutputFormat = cli.format.parse()?;
    if format == OutputFormat::Csv && !cli.command.supports_csv() {
        return Err(WslpgError::InvalidConfigValueError {
            field: "format".to_string(),
            value: cli.format.clone(),
            reason: "CSV output is only available for autorizar, consultar and ajustar".to_string(),
        });
    }
    let client = connect(cli, config).await?;

    match &cli.command {
        Command::Dummy => {
            let status = client.dummy().await?;
            if !status.is_ok() {
                tracing::warn!("⚠️ Service reports degraded status: {:?}", status);
            }
            report::render_json(&status)
        }
        Command::UltNroOrden { pto_emision } => {
            let nro_orden = client.last_order_number(*pto_emision).await?;
            report::render_json(&serde_json::json!({
                "pto_emision": pto_emision,
                "nro_orden": nro_orden,
            }))
        }
        Command::Autorizar { request } => {
            let request: LiquidacionRequest = load_request(request)?;
            let result = client.authorize(&request).await?;
            report::render_autorizacion(&result, format)
        }
        Command::Anular { coe } => report::render_json(&client.void(coe).await?),
        Command::Consultar { coe } => {
            let result = client.query_by_coe(coe).await?;
            report::render_autorizacion(&result, format)
        }
        Command::Ajustar { tipo, request } => {
            let ajuste: Ajuste = load_request(request)?;
            let result = match tipo {
                TipoAjuste::Unificado => client.adjust_unified(&ajuste).await?,
                TipoAjuste::Contrato => client.adjust_contract(&ajuste).await?,
                TipoAjuste::Papel => client.adjust_paper(&ajuste).await?,
            };
            report::render_ajuste(&result, format)
        }
        Command::Tabla { tabla, provincia } => {
            let tabla = match tabla {
                TablaArg::Granos => Tabla::Granos,
                TablaArg::Puertos => Tabla::Puertos,
                TablaArg::Provincias => Tabla::Provincias,
                TablaArg::Grados => Tabla::GradosReferencia,
                TablaArg::Localidades => Tabla::Localidades {
                    cod_provincia: provincia.ok_or_else(|| WslpgError::ValidationError {
                        message: "--provincia is required for localidades".to_string(),
                    })?,
                },
            };
            report::render_json(&client.reference_table(tabla).await?)
        }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting wslpg CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let config = match ClientConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", cli.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(&cli, &config).await {
        Ok(rendered) => match &cli.output {
            Some(path) => {
                tokio::fs::write(path, rendered.as_bytes()).await?;
                tracing::info!("📁 Output saved to: {}", path);
            }
            None => println!("{}", rendered),
        },
        Err(e) => {
            tracing::error!(
                "❌ Operation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            std::process::exit(e.severity().exit_code());
        }
    }

    Ok(())
}
