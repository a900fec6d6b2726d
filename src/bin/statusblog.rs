//! Command-line front end for a statusblog store

use clap::{Arg, ArgMatches, Command};
use log::warn;
use std::path::Path;
use std::time::Duration;

use statusblog::models::Entity;
use statusblog::prelude::*;
use statusblog::realtime::SyncChannel;

/// How long to wait for a change to come back through the subscription
const ROUND_TRIP_TIMEOUT: Duration = Duration::from_secs(10);

fn cli() -> Command<'static> {
    Command::new("statusblog")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Read and manage blog posts and status gauges")
        .subcommand_required(true)
        .arg(
            Arg::new("url")
                .long("url")
                .takes_value(true)
                .global(true)
                .help("Store base URL (defaults to STATUSBLOG_URL)"),
        )
        .arg(
            Arg::new("key")
                .long("key")
                .takes_value(true)
                .global(true)
                .help("Store API key (defaults to STATUSBLOG_KEY)"),
        )
        .arg(
            Arg::new("password")
                .long("password")
                .short('p')
                .takes_value(true)
                .global(true)
                .help("Admin password, required for changes"),
        )
        .subcommand(Command::new("posts").about("List posts, newest first"))
        .subcommand(Command::new("gauges").about("List gauges by column"))
        .subcommand(
            Command::new("add-post")
                .about("Create a post")
                .arg(Arg::new("title").long("title").takes_value(true).required(true))
                .arg(Arg::new("text").long("text").takes_value(true).required(true))
                .arg(
                    Arg::new("image")
                        .long("image")
                        .takes_value(true)
                        .value_name("FILE")
                        .help("Image file to attach"),
                ),
        )
        .subcommand(
            Command::new("delete-post")
                .about("Delete a post")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(gauge_args(
            Command::new("add-gauge")
                .about("Create a gauge")
                .arg(Arg::new("title").long("title").takes_value(true).required(true)),
        ))
        .subcommand(gauge_args(
            Command::new("edit-gauge")
                .about("Change an existing gauge")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("title").long("title").takes_value(true)),
        ))
        .subcommand(
            Command::new("delete-gauge")
                .about("Delete a gauge")
                .arg(Arg::new("id").required(true)),
        )
}

fn gauge_args(command: Command<'static>) -> Command<'static> {
    command
        .arg(Arg::new("value").long("value").takes_value(true).help("Reading, 0 to 100"))
        .arg(
            Arg::new("type")
                .long("type")
                .takes_value(true)
                .possible_values(["radial", "semicircle"]),
        )
        .arg(
            Arg::new("side")
                .long("side")
                .takes_value(true)
                .possible_values(["left", "right"]),
        )
        .arg(
            Arg::new("color")
                .long("color")
                .takes_value(true)
                .multiple_occurrences(true)
                .value_name("INDEX=COLOR")
                .help("Set one color slot (0, 1 or 2), e.g. 0=#22c55e"),
        )
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    if let Err(e) = run(cli().get_matches()).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(matches: ArgMatches) -> Result<(), Error> {
    let config = match (matches.value_of("url"), matches.value_of("key")) {
        (Some(url), Some(key)) => StoreConfig::new(url, key)?,
        _ => StoreConfig::from_env()?,
    };
    let options = ClientOptions::from_env()?;
    let mut blog = StatusBlog::connect_rest(config, options).await?;

    if let Some(password) = matches.value_of("password") {
        blog.session().submit_password(password)?;
    }

    let result = dispatch(&mut blog, &matches).await;
    blog.shutdown().await;
    result
}

async fn dispatch(blog: &mut StatusBlog, matches: &ArgMatches) -> Result<(), Error> {
    match matches.subcommand() {
        Some(("posts", _)) => {
            for post in blog.posts().ready().await?.iter() {
                let image = if post.has_image() { " [image]" } else { "" };
                println!("{}  {}  {}{}", post.created_at, post.id, post.title, image);
                println!("    {}", post.text.replace('\n', "\n    "));
            }
        }
        Some(("gauges", _)) => {
            blog.gauges().ready().await?;
            let columns = blog.gauge_columns();
            for (side, gauges) in [(Side::Left, &columns.left), (Side::Right, &columns.right)] {
                println!("{}:", side);
                for gauge in gauges {
                    println!(
                        "  {}  {:>5.1}  {} ({}) {}",
                        gauge.id,
                        gauge.value,
                        gauge.title,
                        gauge.gauge_type,
                        gauge.colors.join(",")
                    );
                }
            }
        }
        Some(("add-post", args)) => {
            let manager = blog.post_manager();
            manager.open_form()?;
            manager.set_title(args.value_of("title").unwrap_or_default());
            manager.set_text(args.value_of("text").unwrap_or_default());
            if let Some(image) = args.value_of("image") {
                manager.attach_image(Path::new(image)).await?;
            }
            let id = manager.submit().await?;
            await_round_trip(blog.posts(), |posts| posts.iter().any(|p| p.id == id)).await;
            println!("created post {}", id);
        }
        Some(("delete-post", args)) => {
            let id = args.value_of("id").unwrap_or_default();
            let post = find(blog.posts(), id).await?;
            blog.post_manager().request_delete(&post)?;
            blog.post_manager().confirm_delete().await?;
            await_round_trip(blog.posts(), |posts| posts.iter().all(|p| p.id != id)).await;
            println!("deleted post {}", id);
        }
        Some(("add-gauge", args)) => {
            let manager = blog.gauge_manager();
            manager.open_form()?;
            manager.form_mut().set_title(args.value_of("title").unwrap_or_default());
            apply_gauge_args(manager.form_mut(), args)?;
            let id = manager.submit_new().await?;
            await_round_trip(blog.gauges(), |gauges| gauges.iter().any(|g| g.id == id)).await;
            println!("created gauge {}", id);
        }
        Some(("edit-gauge", args)) => {
            let id = args.value_of("id").unwrap_or_default();
            let gauge = find(blog.gauges(), id).await?;
            let manager = blog.gauge_manager();
            manager.open_editor(&gauge)?;
            if let Some(title) = args.value_of("title") {
                manager.form_mut().set_title(title);
            }
            apply_gauge_args(manager.form_mut(), args)?;
            let expected = manager.form().clone();
            manager.update_gauge().await?;
            await_round_trip(blog.gauges(), |gauges| {
                gauges.iter().any(|g| {
                    g.id == id
                        && g.title == expected.title.trim()
                        && g.value == expected.value
                        && g.gauge_type == expected.gauge_type
                        && g.side == expected.side
                })
            })
            .await;
            println!("updated gauge {}", id);
        }
        Some(("delete-gauge", args)) => {
            let id = args.value_of("id").unwrap_or_default();
            let gauge = find(blog.gauges(), id).await?;
            blog.gauge_manager().request_delete(&gauge)?;
            blog.gauge_manager().confirm_delete().await?;
            await_round_trip(blog.gauges(), |gauges| gauges.iter().all(|g| g.id != id)).await;
            println!("deleted gauge {}", id);
        }
        _ => unreachable!("subcommand_required"),
    }
    Ok(())
}

fn apply_gauge_args(form: &mut GaugeForm, args: &ArgMatches) -> Result<(), Error> {
    if let Some(value) = args.value_of("value") {
        let value: f64 = value
            .parse()
            .map_err(|_| Error::validation(format!("not a number: {}", value)))?;
        form.set_value(value);
    }
    if let Some(gauge_type) = args.value_of("type") {
        form.set_type(gauge_type.parse()?);
    }
    if let Some(side) = args.value_of("side") {
        form.set_side(side.parse()?);
    }
    for slot in args.values_of("color").into_iter().flatten() {
        let (index, color) = slot
            .split_once('=')
            .ok_or_else(|| Error::validation(format!("expected INDEX=COLOR, got {}", slot)))?;
        let index: usize = index
            .trim()
            .parse()
            .map_err(|_| Error::validation(format!("bad color slot: {}", index)))?;
        form.set_color_at(index, color.trim())?;
    }
    Ok(())
}

async fn find<T: Entity>(channel: &SyncChannel<T>, id: &str) -> Result<T, Error> {
    channel
        .ready()
        .await?
        .iter()
        .find(|item| item.id() == id)
        .cloned()
        .ok_or_else(|| Error::general(format!("no {} entry with id {}", channel.collection(), id)))
}

async fn await_round_trip<T, F>(channel: &SyncChannel<T>, predicate: F)
where
    T: Entity,
    F: FnMut(&[T]) -> bool,
{
    match tokio::time::timeout(ROUND_TRIP_TIMEOUT, channel.wait_until(predicate)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => warn!("{}: {}", channel.collection(), e),
        Err(_) => warn!(
            "{}: change not visible after {:?}",
            channel.collection(),
            ROUND_TRIP_TIMEOUT
        ),
    }
}
