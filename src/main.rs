use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use telco_backoffice::api::consulta::{
    buscar_clientes, HttpLegacyGateway, LegacyGateway, ResumenCliente,
};
use telco_backoffice::api::resources::{
    CambioEstado, Cliente, Componente, CrudResource, EquipoOnu, EstadisticasClientes,
    EstadoEquipo, Lote, Marca, Modelo, Permiso, Plan, ResourceKind, Rol, TipoEquipo, Usuario,
};
use telco_backoffice::api::{ApiClient, Resource};
use telco_backoffice::app::App;
use telco_backoffice::busy::CancelSignal;
use telco_backoffice::config::Config;
use telco_backoffice::consulta::{
    fetch_resumen, ConsultaError, MigrationOrchestrator, RunOutcome, RunState,
};
use telco_backoffice::listing::ListView;
use telco_backoffice::logging;
use telco_backoffice::ui::resource_list::ListRow;

#[derive(Parser)]
#[command(name = "backoffice")]
#[command(about = "Back-office client for customers, equipment and legacy migration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Migrate a customer from the legacy system and print the summary
    Consulta {
        /// Identity document number
        documento: String,
    },

    /// Print the local summary of an already migrated customer
    Resumen {
        /// Identity document number
        documento: String,
    },

    /// Search migrated customers by name
    Buscar {
        /// At least two characters
        nombre: String,
    },

    /// List every migrated customer
    Locales,

    /// List a collection with optional local filters
    List {
        /// usuarios, roles, permisos, marcas, modelos, tipos-equipo, estados-equipo,
        /// componentes, lotes, equipos, clientes or planes
        resource: ResourceKind,

        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Page to show (1-based)
        #[arg(short, long, default_value_t = 1)]
        page: usize,

        /// Field filter as key=value (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },

    /// Delete a record by id
    Delete {
        resource: ResourceKind,
        id: i64,
    },

    /// Move an ONU device to another inventory state
    CambiarEstado {
        /// Device id
        id: i64,

        /// Target state id
        estado_id: i64,

        #[arg(short, long)]
        observaciones: Option<String>,
    },

    /// Account actions on a user
    Usuario {
        /// User id
        id: i64,

        #[command(subcommand)]
        accion: UsuarioAccion,
    },

    /// Customer counts by state, type, coverage and zone
    Estadisticas,
}

#[derive(Subcommand)]
enum UsuarioAccion {
    /// Re-enable the account
    Activar,
    /// Reset the password to the server default
    ResetearPassword,
    /// Assign another role
    CambiarRol { rol_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    // Determine if we're running in TUI mode (no subcommand)
    let is_tui_mode = cli.command.is_none();

    // Initialize logging (file-based for TUI, stderr for CLI)
    let logging_handle = logging::init_logging(&config, is_tui_mode, cli.debug)?;

    match cli.command {
        Some(Commands::Consulta { documento }) => cmd_consulta(&config, &documento).await?,
        Some(Commands::Resumen { documento }) => cmd_resumen(&config, &documento).await?,
        Some(Commands::Buscar { nombre }) => cmd_buscar(&config, &nombre).await?,
        Some(Commands::Locales) => cmd_locales(&config).await?,
        Some(Commands::List {
            resource,
            search,
            page,
            filters,
        }) => cmd_list(&config, resource, search.as_deref(), page, &filters).await?,
        Some(Commands::Delete { resource, id }) => cmd_delete(&config, resource, id).await?,
        Some(Commands::CambiarEstado {
            id,
            estado_id,
            observaciones,
        }) => cmd_cambiar_estado(&config, id, estado_id, observaciones).await?,
        Some(Commands::Usuario { id, accion }) => cmd_usuario(&config, id, accion).await?,
        Some(Commands::Estadisticas) => cmd_estadisticas(&config).await?,
        None => {
            // No subcommand = launch TUI
            run_tui(config, logging_handle.log_file_path).await?;
        }
    }

    Ok(())
}

async fn run_tui(config: Config, log_file_path: Option<PathBuf>) -> Result<()> {
    let mut app = App::new(config)?;
    let result = app.run().await;

    // Print log file path on exit if logs were written
    if let Some(log_path) = log_file_path {
        if let Ok(metadata) = log_path.metadata() {
            if metadata.len() > 0 {
                eprintln!("Session log: {}", log_path.display());
            }
        }
    }

    result
}

fn api_client(config: &Config) -> Result<ApiClient> {
    ApiClient::from_config(&config.api).context("invalid API configuration")
}

fn legacy_gateway(config: &Config) -> Result<Arc<dyn LegacyGateway>> {
    Ok(Arc::new(HttpLegacyGateway::new(
        api_client(config)?,
        &config.api.consulta_prefix,
    )))
}

fn print_consulta_error(err: &ConsultaError) {
    eprintln!("Error: {}", err.user_message());
    if let Some(hint) = err.hint() {
        eprintln!("{hint}");
    }
}

fn print_resumen(resumen: &ResumenCliente) {
    let c = &resumen.cliente;
    println!(
        "{} (documento {}, código {})",
        c.nombres.as_deref().unwrap_or("-"),
        c.nro_documento.as_deref().unwrap_or("-"),
        c.cod_cliente.as_deref().unwrap_or("-")
    );
    println!("{}", "─".repeat(60));

    if resumen.servicios.is_empty() {
        println!("Sin servicios registrados");
    }
    for s in &resumen.servicios {
        let monto = s
            .facturas_resumen
            .total_monto
            .map_or_else(|| "-".to_string(), |m| format!("Bs. {m:.2}"));
        println!(
            "  {:<10} {:<24} {:>3} factura(s)  {}",
            s.servicio.contrato.as_deref().unwrap_or("-"),
            s.servicio.plan_comercial.as_deref().unwrap_or("sin plan"),
            s.facturas_resumen.cantidad_facturas,
            monto
        );
    }
    println!("{}", "─".repeat(60));
    println!(
        "Total: {} servicio(s), {} factura(s), Bs. {:.2}",
        resumen.servicios.len(),
        resumen.total_facturas(),
        resumen.total_monto()
    );
}

async fn cmd_consulta(config: &Config, documento: &str) -> Result<()> {
    let gateway = legacy_gateway(config)?;
    let mut orchestrator = MigrationOrchestrator::new(gateway).with_observer(|snapshot| {
        match snapshot.state {
            RunState::Running { step } => println!("[{:>3}%] {}...", snapshot.progress, step.title()),
            RunState::Completed => println!("[100%] Completado"),
            RunState::Failed { step } => println!("[{:>3}%] {} falló", snapshot.progress, step.title()),
            RunState::Idle => {}
        }
    });

    match orchestrator.run(documento, &CancelSignal::new()).await {
        Ok(RunOutcome::Completed(resumen)) => {
            let (cliente, servicios, facturas) = orchestrator.results().migrated_counts();
            println!();
            println!("Migrados: {cliente} cliente, {servicios} servicio(s), {facturas} factura(s)");
            println!();
            print_resumen(&resumen);
            Ok(())
        }
        Ok(RunOutcome::Cancelled) => bail!("consulta cancelada"),
        Err(err) => {
            print_consulta_error(&err);
            std::process::exit(1);
        }
    }
}

async fn cmd_resumen(config: &Config, documento: &str) -> Result<()> {
    let gateway = legacy_gateway(config)?;
    match fetch_resumen(gateway.as_ref(), documento).await {
        Ok(resumen) => {
            print_resumen(&resumen);
            Ok(())
        }
        Err(err) => {
            print_consulta_error(&err);
            std::process::exit(1);
        }
    }
}

async fn cmd_buscar(config: &Config, nombre: &str) -> Result<()> {
    let gateway = legacy_gateway(config)?;
    let clientes = buscar_clientes(gateway.as_ref(), nombre)
        .await
        .context("customer search failed")?;

    if clientes.is_empty() {
        println!("Sin resultados (la búsqueda requiere al menos 2 caracteres)");
        return Ok(());
    }
    for c in &clientes {
        println!(
            "{:<10} {:<12} {}",
            c.cod_cliente.as_deref().unwrap_or("-"),
            c.nro_documento.as_deref().unwrap_or("-"),
            c.display_name()
        );
    }
    Ok(())
}

async fn cmd_locales(config: &Config) -> Result<()> {
    let gateway = legacy_gateway(config)?;
    let clientes = gateway
        .clientes_locales()
        .await
        .context("could not list migrated customers")?;

    println!("Clientes migrados ({})", clientes.len());
    println!("{}", "─".repeat(60));
    for c in &clientes {
        println!(
            "{:<10} {:<12} {:<30} {}",
            c.cod_cliente.as_deref().unwrap_or("-"),
            c.nro_documento.as_deref().unwrap_or("-"),
            c.display_name(),
            c.fecha_migracion.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn cmd_list(
    config: &Config,
    resource: ResourceKind,
    search: Option<&str>,
    page: usize,
    filters: &[String],
) -> Result<()> {
    let client = api_client(config)?;
    let page_size = config.ui.page_size;
    match resource {
        ResourceKind::Usuarios => print_list::<Usuario>(client, page_size, search, page, filters).await,
        ResourceKind::Roles => print_list::<Rol>(client, page_size, search, page, filters).await,
        ResourceKind::Permisos => print_list::<Permiso>(client, page_size, search, page, filters).await,
        ResourceKind::Marcas => print_list::<Marca>(client, page_size, search, page, filters).await,
        ResourceKind::Modelos => print_list::<Modelo>(client, page_size, search, page, filters).await,
        ResourceKind::TiposEquipo => {
            print_list::<TipoEquipo>(client, page_size, search, page, filters).await
        }
        ResourceKind::EstadosEquipo => {
            print_list::<EstadoEquipo>(client, page_size, search, page, filters).await
        }
        ResourceKind::Componentes => {
            print_list::<Componente>(client, page_size, search, page, filters).await
        }
        ResourceKind::Lotes => print_list::<Lote>(client, page_size, search, page, filters).await,
        ResourceKind::Equipos => print_list::<EquipoOnu>(client, page_size, search, page, filters).await,
        ResourceKind::Clientes => print_list::<Cliente>(client, page_size, search, page, filters).await,
        ResourceKind::Planes => print_list::<Plan>(client, page_size, search, page, filters).await,
    }
}

async fn print_list<T: ListRow>(
    client: ApiClient,
    page_size: usize,
    search: Option<&str>,
    page: usize,
    filters: &[String],
) -> Result<()> {
    let items = CrudResource::<T>::new(client)
        .list()
        .await
        .with_context(|| format!("could not load {}", T::LABEL))?;

    let mut view = ListView::new(page_size);
    view.set_items(items);
    for assignment in filters {
        view.apply_assignment(assignment)?;
    }
    if let Some(text) = search {
        view.set_search(text);
    }
    view.pages_mut().go_to_page(page);

    if let Some(summary) = T::summary(view.all_items()) {
        println!("{summary}");
    }
    println!("{} ({} de {})", T::LABEL, view.filtered().len(), view.all_items().len());
    println!("{}", "─".repeat(60));
    if view.is_filtered_empty() {
        println!("Sin resultados para los filtros actuales");
    }
    for item in view.visible() {
        let id = item.id().map_or_else(|| "-".to_string(), |id| id.to_string());
        println!("{id:>5}  {}", item.display_line());
    }
    println!("{}", view.footer_text());
    Ok(())
}

async fn cmd_delete(config: &Config, resource: ResourceKind, id: i64) -> Result<()> {
    let client = api_client(config)?;
    let path = format!("{}{}/", resource.path(), id);
    client
        .delete(&path)
        .await
        .with_context(|| format!("could not delete {resource} {id}"))?;
    println!("{} {} eliminado", resource.label(), id);
    Ok(())
}

async fn cmd_cambiar_estado(
    config: &Config,
    id: i64,
    estado_id: i64,
    observaciones: Option<String>,
) -> Result<()> {
    let equipos = CrudResource::<EquipoOnu>::new(api_client(config)?);
    equipos
        .cambiar_estado(id, &CambioEstado::new(estado_id, observaciones))
        .await
        .with_context(|| format!("could not change state of device {id}"))?;
    let equipo = equipos.get(id).await.context("could not reload device")?;
    println!("{}", equipo.display_line());
    Ok(())
}

async fn cmd_usuario(config: &Config, id: i64, accion: UsuarioAccion) -> Result<()> {
    let usuarios = CrudResource::<Usuario>::new(api_client(config)?);
    match accion {
        UsuarioAccion::Activar => {
            usuarios
                .activar(id)
                .await
                .with_context(|| format!("could not activate user {id}"))?;
            println!("Usuario {id} activado");
        }
        UsuarioAccion::ResetearPassword => {
            let message = usuarios
                .resetear_password(id)
                .await
                .with_context(|| format!("could not reset password of user {id}"))?;
            println!(
                "{}",
                message.unwrap_or_else(|| format!("Contraseña del usuario {id} restablecida"))
            );
        }
        UsuarioAccion::CambiarRol { rol_id } => {
            usuarios
                .cambiar_rol(id, rol_id)
                .await
                .with_context(|| format!("could not change role of user {id}"))?;
            println!("Usuario {id} ahora tiene el rol {rol_id}");
        }
    }
    Ok(())
}

fn print_estadisticas(stats: &EstadisticasClientes) {
    let r = &stats.resumen;
    println!(
        "{} clientes · {} activos ({:.2}%) · {} pendientes · {} suspendidos",
        r.total_clientes,
        r.total_activos,
        r.porcentaje_activos.unwrap_or_default(),
        r.total_pendientes,
        r.total_suspendidos
    );
    println!("{}", "─".repeat(60));
    for e in &stats.por_estado {
        println!(
            "  {:<28} {:>5}  ({} con cobertura, {} sin cobertura)",
            e.estado.label(),
            e.total,
            e.con_cobertura,
            e.sin_cobertura
        );
    }
    for t in &stats.por_tipo {
        println!("  {:<28} {:>5}", t.tipo_cliente.as_str(), t.total);
    }
    for c in &stats.por_cobertura {
        println!("  {:<28} {:>5}", c.cobertura.label(), c.total);
    }
    if !stats.top_zonas.is_empty() {
        println!("Zonas con más clientes:");
        for z in &stats.top_zonas {
            println!("  {:<28} {:>5}", z.zona.as_deref().unwrap_or("(sin zona)"), z.total);
        }
    }
}

async fn cmd_estadisticas(config: &Config) -> Result<()> {
    let stats = CrudResource::<Cliente>::new(api_client(config)?)
        .estadisticas()
        .await
        .context("could not load customer statistics")?;
    print_estadisticas(&stats);
    Ok(())
}
