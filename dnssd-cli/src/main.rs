//! dns-sd entry point.
//!
//! ```text
//! dns-sd enumerate [--registration]           Domains to browse / register in
//! dns-sd browse <type> [domain]               Instances of a service type
//! dns-sd resolve <name> <type> [domain]       Host, port and TXT of an instance
//! dns-sd query <fullname> [rrtype]            Raw resource records
//! dns-sd register <name> <type> <port> [k=v]  Advertise a service
//! dns-sd nat [--tcp|--udp] [int] [ext]        NAT port mapping
//! dns-sd reconfirm <fullname> <rrtype> <hex> -i <if>  Flush a stale record
//! dns-sd full-name <type> <domain> [--service n]
//! dns-sd txt encode [k=v ...] | decode <hex> [--lenient]
//! dns-sd --gen-config                         Write default config to stdout
//! ```

use std::path::PathBuf;

use bytes::Bytes;
use clap::{CommandFactory, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dnssd_cli::config::ToolConfig;
use dnssd_cli::output::{from_hex, to_hex, txt_map};
use dnssd_cli::txt_args::build_record;
use dnssd_core::protocol::{
    BrowseRequest, EnumerateDomainsRequest, PortMappingRequest, QueryRequest,
    ReconfirmRecordRequest, RegisterServiceRequest, ResolveRequest, rr,
};
use dnssd_core::{
    ParseMode, ParsedTxtRecord, PortMappingProtocol, Request, ServiceFlags, construct_full_name,
};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "dns-sd", about = "Browse, resolve and register DNS-SD services")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "dns-sd.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Print one JSON object per reply.
    #[arg(long, global = true)]
    json: bool,

    /// Stop after this many seconds (overrides the config file).
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List recommended browse (or registration) domains.
    Enumerate {
        #[arg(long)]
        registration: bool,
    },
    /// Browse for instances of a service type.
    Browse {
        regtype: String,
        domain: Option<String>,
    },
    /// Resolve an instance to host, port and TXT record.
    Resolve {
        name: String,
        regtype: String,
        #[arg(default_value = "local.")]
        domain: String,
    },
    /// Query resource records of any type.
    Query {
        fullname: String,
        /// Type name (A, AAAA, PTR, SRV, TXT, ...) or number.
        #[arg(default_value = "A")]
        rrtype: String,
        /// Keep the query open for changes.
        #[arg(long)]
        long_lived: bool,
    },
    /// Register a service. An empty name lets the daemon choose.
    Register {
        name: String,
        regtype: String,
        port: u16,
        /// TXT entries as `key=value` or `key`.
        txt: Vec<String>,
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        host: Option<String>,
        /// Fail on name conflicts instead of renaming.
        #[arg(long)]
        no_rename: bool,
    },
    /// Request a NAT port mapping, or just the external address.
    Nat {
        #[arg(long)]
        tcp: bool,
        #[arg(long)]
        udp: bool,
        internal_port: Option<u16>,
        external_port: Option<u16>,
        #[arg(long, default_value_t = 0)]
        ttl: u32,
    },
    /// Ask the daemon to re-verify a record that looks stale.
    Reconfirm {
        fullname: String,
        /// Type name (A, AAAA, PTR, SRV, TXT, ...) or number.
        rrtype: String,
        /// Record data as hex.
        rdata: String,
        /// Interface the record was seen on.
        #[arg(short, long)]
        interface: u32,
    },
    /// Build an escaped full domain name.
    FullName {
        regtype: String,
        domain: String,
        #[arg(long)]
        service: Option<String>,
    },
    /// Encode or decode TXT record data.
    Txt {
        #[command(subcommand)]
        action: TxtCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TxtCommand {
    /// Print the hex wire form of `key=value` entries.
    Encode { entries: Vec<String> },
    /// Print the entries of hex-encoded TXT data.
    Decode {
        hex: String,
        /// Keep entries before a truncated tail.
        #[arg(long)]
        lenient: bool,
    },
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ToolConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    // Load config.
    let mut config = ToolConfig::load(&cli.config);
    if let Some(secs) = cli.timeout {
        config.session.timeout_secs = secs;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("dns-sd v{}", env!("CARGO_PKG_VERSION"));

    // Offline commands.
    let request = match command {
        Command::FullName {
            regtype,
            domain,
            service,
        } => {
            println!("{}", construct_full_name(service.as_deref(), &regtype, &domain)?);
            return Ok(());
        }
        Command::Txt { action } => return txt_command(action, &config, cli.json),
        #[cfg(unix)]
        Command::Reconfirm {
            fullname,
            rrtype,
            rdata,
            interface,
        } => {
            let rrtype = rr::type_from_name(&rrtype)
                .ok_or_else(|| format!("unknown record type: {rrtype}"))?;
            let request = ReconfirmRecordRequest::new(interface, fullname, rrtype, from_hex(&rdata)?);
            dnssd_core::DaemonClient::new(config.daemon.clone())
                .reconfirm_record(request)
                .await?;
            info!("reconfirm accepted");
            return Ok(());
        }
        other => build_request(other, &config)?,
    };

    // Daemon commands.
    #[cfg(unix)]
    {
        info!("daemon socket: {}", config.daemon.socket_path.display());
        dnssd_cli::runner::run_session(&config, request, cli.json).await
    }
    #[cfg(not(unix))]
    {
        let _ = request;
        eprintln!("Daemon sessions are only available on Unix platforms.");
        std::process::exit(1);
    }
}

fn build_request(
    command: Command,
    config: &ToolConfig,
) -> Result<Request, Box<dyn std::error::Error>> {
    let request = match command {
        Command::Enumerate { registration } => Request::EnumerateDomains(if registration {
            EnumerateDomainsRequest::registration()
        } else {
            EnumerateDomainsRequest::browse()
        }),
        Command::Browse { regtype, domain } => {
            let mut req = BrowseRequest::new(regtype);
            if let Some(domain) = domain {
                req = req.in_domain(domain);
            }
            Request::Browse(req)
        }
        Command::Resolve {
            name,
            regtype,
            domain,
        } => Request::Resolve(ResolveRequest::new(name, regtype, domain)),
        Command::Query {
            fullname,
            rrtype,
            long_lived,
        } => {
            let rrtype = rr::type_from_name(&rrtype)
                .ok_or_else(|| format!("unknown record type: {rrtype}"))?;
            let mut req = QueryRequest::new(fullname, rrtype);
            if long_lived {
                req = req.long_lived();
            }
            Request::QueryRecord(req)
        }
        Command::Register {
            name,
            regtype,
            port,
            txt,
            domain,
            host,
            no_rename,
        } => {
            let record = build_record(&txt, config.session.txt_capacity)?;
            let mut req = RegisterServiceRequest::new(regtype, port).with_txt(&record);
            if !name.is_empty() {
                req = req.named(name);
            }
            req.domain = domain;
            req.host = host;
            if no_rename {
                req.flags |= ServiceFlags::NO_AUTO_RENAME;
            }
            Request::RegisterService(req)
        }
        Command::Nat {
            tcp,
            udp,
            internal_port,
            external_port,
            ttl,
        } => {
            let mut protocol = PortMappingProtocol::empty();
            protocol.set(PortMappingProtocol::TCP, tcp);
            protocol.set(PortMappingProtocol::UDP, udp);
            let mut req = match internal_port {
                Some(port) => PortMappingRequest::new(protocol, port),
                None => PortMappingRequest::external_address(),
            };
            req.external_port = external_port.unwrap_or(0);
            req.ttl = ttl;
            Request::PortMapping(req)
        }
        Command::FullName { .. } | Command::Txt { .. } | Command::Reconfirm { .. } => {
            return Err("not a session command".into());
        }
    };
    Ok(request)
}

fn txt_command(
    action: TxtCommand,
    config: &ToolConfig,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TxtCommand::Encode { entries } => {
            let record = build_record(&entries, config.session.txt_capacity)?;
            println!("{}", to_hex(&record.serialize()));
        }
        TxtCommand::Decode { hex: text, lenient } => {
            let data = from_hex(&text)?;
            let mode = if lenient {
                ParseMode::Lenient
            } else {
                ParseMode::Strict
            };
            let parsed = ParsedTxtRecord::parse_with(Bytes::from(data), mode)?;
            if json {
                println!("{}", serde_json::to_string(&txt_map(&parsed))?);
            } else {
                for entry in parsed.iter() {
                    match entry.value_lossy() {
                        Some(value) => println!("{}={value}", entry.key_lossy()),
                        None => println!("{}", entry.key_lossy()),
                    }
                }
            }
            if parsed.is_truncated() {
                tracing::warn!("input was truncated; trailing bytes ignored");
            }
        }
    }
    Ok(())
}
