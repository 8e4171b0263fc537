use anyhow::Result;
use clap::Parser;
use mars_colony_core::{
    WorldKind,
    entity::{EntityView, MarsBase, Obstacle},
    world::{World, WorldConfig},
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::{
        Block, Borders, Paragraph,
        canvas::{Canvas, Points, Rectangle},
    },
};
use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};
use tracing::info;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Number of obstacles to scatter
    #[arg(long, default_value_t = 20)]
    obstacles: u32,
    /// Number of rocks to scatter; also the delivery target
    #[arg(long, default_value_t = 100)]
    rocks: u32,
    /// Number of explorer agents
    #[arg(long, default_value_t = 10)]
    explorers: u32,
    /// Number of carrier agents
    #[arg(long, default_value_t = 0)]
    carriers: u32,
    /// Enable chemical-trail coordination
    #[arg(long)]
    trails: bool,
    /// Field width in world units
    #[arg(long, default_value_t = 800.0)]
    width: f64,
    /// Field height in world units
    #[arg(long, default_value_t = 600.0)]
    height: f64,
    /// Seed for reproducible runs
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Milliseconds between simulation steps
    #[arg(long, default_value_t = 30)]
    tick_ms: u64,
}

struct App {
    /// The core simulation world.
    world: World,
    /// Time between simulation steps.
    tick_rate: Duration,
    /// Flag to control the main loop.
    should_quit: bool,
    /// Freeze the simulation while still rendering.
    paused: bool,
}

impl App {
    fn new(world: World, tick_rate: Duration) -> Self {
        App {
            world,
            tick_rate,
            should_quit: false,
            paused: false,
        }
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) {
        if self.paused || self.world.is_done() {
            return;
        }
        self.world.tick();
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();
    let config = WorldConfig {
        width: args.width,
        height: args.height,
        kind: if args.trails {
            WorldKind::Trails
        } else {
            WorldKind::Standard
        },
        obstacles: args.obstacles,
        rocks: args.rocks,
        explorers: args.explorers,
        carriers: args.carriers,
        seed: args.seed,
    };
    info!(?config, "populating world");
    let world = World::from_config(&config)?;

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    let mut app = App::new(world, Duration::from_millis(args.tick_ms));

    // Run the main application loop
    run_app(&mut terminal, &mut app)?;

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    info!(
        ticks = app.world.ticks(),
        collected = app.world.rocks_collected(),
        "simulation stopped"
    );
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = app
            .tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.paused = !app.paused,
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= app.tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(90), // Area for the field
            Constraint::Percentage(10), // Area for status/help
        ])
        .split(frame.area());

    render_field(frame, main_layout[0], &app.world);
    render_status(frame, main_layout[1], app);
}

/// Renders the simulation field onto the frame.
fn render_field(frame: &mut Frame, area: Rect, world: &World) {
    let mut rocks: Vec<(f64, f64)> = Vec::new();
    let mut particles: Vec<(f64, f64)> = Vec::new();
    let mut searching: Vec<(f64, f64)> = Vec::new();
    let mut hauling: Vec<(f64, f64)> = Vec::new();
    let mut carriers: Vec<(f64, f64)> = Vec::new();
    let mut blocks: Vec<Rectangle> = Vec::new();

    for entity in world.entities() {
        match entity {
            EntityView::Rock(rock) => rocks.push((rock.position.x, rock.position.y)),
            EntityView::Particle(particle) => {
                particles.push((particle.position.x, particle.position.y))
            }
            EntityView::Obstacle(obstacle) => blocks.push(Rectangle {
                x: obstacle.position.x - Obstacle::SIZE,
                y: obstacle.position.y - Obstacle::SIZE,
                width: Obstacle::SIZE * 2.0,
                height: Obstacle::SIZE * 2.0,
                color: Color::DarkGray,
            }),
            EntityView::Base(base) => blocks.push(Rectangle {
                x: base.position.x - MarsBase::SIZE,
                y: base.position.y - MarsBase::SIZE,
                width: MarsBase::SIZE * 2.0,
                height: MarsBase::SIZE * 2.0,
                color: Color::White,
            }),
            EntityView::Explorer(explorer) => {
                let point = (explorer.position.x, explorer.position.y);
                if explorer.has_rock {
                    hauling.push(point);
                } else {
                    searching.push(point);
                }
            }
            EntityView::Carrier(carrier) => {
                carriers.push((carrier.position.x, carrier.position.y))
            }
        }
    }

    let canvas = Canvas::default()
        .block(Block::default().title("Mars Colony").borders(Borders::ALL))
        .x_bounds([0.0, world.width()])
        .y_bounds([0.0, world.height()])
        .paint(|ctx| {
            for block in &blocks {
                ctx.draw(block);
            }
            ctx.draw(&Points {
                coords: &rocks,
                color: Color::Gray,
            });
            ctx.draw(&Points {
                coords: &particles,
                color: Color::Green,
            });
            ctx.draw(&Points {
                coords: &searching,
                color: Color::Blue,
            });
            ctx.draw(&Points {
                coords: &hauling,
                color: Color::Yellow,
            });
            ctx.draw(&Points {
                coords: &carriers,
                color: Color::Magenta,
            });
        });

    frame.render_widget(canvas, area);
}

/// Renders the status line and key help.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let world = &app.world;
    let mut lines = vec![Line::from(format!(
        "tick {} | rocks {}/{} | in carriers {} | explorers {} | carriers {}",
        world.ticks(),
        world.rocks_collected(),
        world.rocks_target(),
        world.rocks_in_carriers(),
        world.explorers().len(),
        world.carriers().len(),
    ))];

    if world.is_done() {
        lines.push(Line::from(Span::styled(
            "Mission complete: every rock delivered.",
            Style::default().fg(Color::Green).bold(),
        )));
    } else if app.paused {
        lines.push(Line::from(Span::styled(
            "Paused",
            Style::default().fg(Color::Yellow),
        )));
    }

    let status = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .title("Space pauses, 'q' or Esc quits"),
        );
    frame.render_widget(status, area);
}
