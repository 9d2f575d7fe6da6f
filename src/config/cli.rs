use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Parser)]
#[command(name = "wslpg")]
#[command(about = "Client for the electronic grain settlement web service (WSLPG)")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "wslpg.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    /// Write the result to this file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Output format for settlement and adjustment results
    #[arg(long, default_value = "json", global = true)]
    pub format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check the status of the remote servers
    Dummy,
    /// Query the last order number used by a point of sale
    UltNroOrden {
        #[arg(long)]
        pto_emision: u32,
    },
    /// Authorize a settlement described in a TOML file
    Autorizar {
        #[arg(long)]
        request: String,
    },
    /// Void an authorized settlement
    Anular {
        #[arg(long)]
        coe: String,
    },
    /// Fetch an authorized settlement by COE
    Consultar {
        #[arg(long)]
        coe: String,
    },
    /// Submit an adjustment described in a TOML file
    Ajustar {
        #[arg(long, value_enum)]
        tipo: TipoAjuste,
        #[arg(long)]
        request: String,
    },
    /// List a reference table
    Tabla {
        #[arg(value_enum)]
        tabla: TablaArg,
        /// Province code, required for `localidades`
        #[arg(long)]
        provincia: Option<u32>,
    },
}

impl Command {
    /// 只有結算與調整結果有 CSV 格式；其他指令一律輸出 JSON
    pub fn supports_csv(&self) -> bool {
        matches!(
            self,
            Command::Autorizar { .. } | Command::Consultar { .. } | Command::Ajustar { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TipoAjuste {
    Unificado,
    Contrato,
    Papel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TablaArg {
    Granos,
    Puertos,
    Provincias,
    Localidades,
    Grados,
}
