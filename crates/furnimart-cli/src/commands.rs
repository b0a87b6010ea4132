use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use furnimart_core::auth::claims;
use furnimart_core::models::{ImageUpload, ListingDraft, ListingStatus, ListingUpdate};
use furnimart_core::{ApiClient, Config, GuardState, RouteGuard};

use crate::view;
use crate::Commands;

/// Environment variable consulted before prompting for a password
const PASSWORD_ENV: &str = "FURNIMART_PASSWORD";

pub struct Context {
    pub client: ApiClient,
    pub json: bool,
}

impl Context {
    fn print<T: Serialize>(&self, value: &T, render: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            render(value);
        }
        Ok(())
    }

    /// Gate a protected command. Prints nothing while the check runs; an
    /// unauthorized result leaves the login hint to the navigator.
    async fn require_login(&self, destination: &str) -> Result<()> {
        let mut guard = RouteGuard::new(self.client.session().clone(), destination);
        match guard.resolve().await {
            GuardState::Authorized => Ok(()),
            _ => bail!("Not signed in"),
        }
    }
}

pub(crate) async fn run(ctx: &Context, config: &mut Config, command: Commands) -> Result<()> {
    let client = &ctx.client;

    match command {
        Commands::Login { username } => {
            let username = match username.or_else(|| config.last_username.clone()) {
                Some(u) => u,
                None => prompt("Username: ")?,
            };
            let password = match std::env::var(PASSWORD_ENV) {
                Ok(p) if !p.is_empty() => p,
                _ => rpassword::prompt_password("Password: ")?,
            };

            client
                .login(&username, &password)
                .await
                .context("Login failed")?;

            config.last_username = Some(username.clone());
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!("Signed in as {}", username);
        }

        Commands::Register { username } => {
            let password = rpassword::prompt_password("Choose a password: ")?;
            let confirm = rpassword::prompt_password("Repeat password: ")?;
            if password != confirm {
                bail!("Passwords do not match");
            }
            client
                .register(&username, &password)
                .await
                .context("Registration failed")?;
            info!(%username, "Account registered");
            println!("Account created. Run `furnimart login -u {}` to sign in.", username);
        }

        Commands::Logout => {
            client.logout(false);
            println!("Signed out");
        }

        Commands::Status => {
            let session = client.session();
            if !session.is_logged_in() {
                println!("Not signed in");
                return Ok(());
            }
            let user = session.user_id().unwrap_or_else(|| "unknown".to_string());
            let access = session.access_token().unwrap_or_default();
            let expiry = claims::decode(&access)
                .and_then(|c| c.exp)
                .and_then(|exp| chrono::DateTime::from_timestamp(exp, 0));
            match expiry {
                Some(at) if at > Utc::now() => {
                    println!("Signed in as user {} (access token valid until {})", user, at.format("%Y-%m-%d %H:%M UTC"))
                }
                _ => println!("Signed in as user {} (access token expired; it will be renewed on next use)", user),
            }
        }

        Commands::Browse { page } => {
            let listings = client.fetch_homepage(page).await?;
            ctx.print(&listings, |p| view::print_page(p, page))?;
        }

        Commands::Show { id } => {
            ctx.require_login(&format!("/listing/{}", id)).await?;
            let listing = client.fetch_published_listing(id).await?;
            ctx.print(&listing, view::print_listing)?;
        }

        Commands::Mine { status } => {
            ctx.require_login("/mypage").await?;
            let listings = client.fetch_my_listings(status).await?;
            ctx.print(&listings, |l| view::print_summaries(l, &format!("{} listings", status.display_name())))?;
        }

        Commands::Purchases => {
            ctx.require_login("/mypage/purchases").await?;
            let listings = client.fetch_purchases().await?;
            ctx.print(&listings, |l| view::print_summaries(l, "Purchases"))?;
        }

        Commands::Buy { id, yes } => {
            ctx.require_login(&format!("/listing/{}", id)).await?;
            if !yes && !confirm("Are you sure you want to purchase this item? This action cannot be undone. [y/N]: ")? {
                println!("Purchase cancelled");
                return Ok(());
            }
            let receipt = client.purchase(id).await?;
            info!(listing_id = id, "Listing purchased");
            ctx.print(&receipt, |r| println!("{}", r.message))?;
        }

        Commands::Sell {
            title,
            description,
            price,
            category,
            condition,
            images,
            publish,
        } => {
            ctx.require_login("/sell").await?;
            let uploads = read_images(&images)?;
            let draft = ListingDraft {
                title,
                description,
                price,
                category,
                condition,
                status: if publish {
                    ListingStatus::Published
                } else {
                    ListingStatus::Draft
                },
            };
            let listing = client.create_listing(&draft, &uploads).await?;
            ctx.print(&listing, |l| {
                println!("Created listing #{} ({})", l.id, l.status.display_name())
            })?;
        }

        Commands::Edit {
            id,
            title,
            description,
            price,
            category,
            condition,
            images,
            delete_images,
            order,
        } => {
            ctx.require_login(&format!("/sell/{}", id)).await?;
            let update = ListingUpdate {
                title,
                description,
                price,
                category,
                condition,
                status: None,
                new_images: read_images(&images)?,
                deleted_images: delete_images,
                image_order: order,
            };
            let listing = client.update_listing(id, &update).await?;
            ctx.print(&listing, view::print_listing)?;
        }

        Commands::Publish { id } => {
            ctx.require_login("/mypage").await?;
            let listing = client.set_listing_status(id, ListingStatus::Published).await?;
            ctx.print(&listing, |l| println!("Listing #{} is now published", l.id))?;
        }

        Commands::Unpublish { id } => {
            ctx.require_login("/mypage").await?;
            let listing = client.set_listing_status(id, ListingStatus::Draft).await?;
            ctx.print(&listing, |l| println!("Listing #{} moved back to drafts", l.id))?;
        }

        Commands::Delete { id } => {
            ctx.require_login("/mypage").await?;
            client.delete_listing(id).await?;
            println!("Listing #{} deleted", id);
        }
    }

    Ok(())
}

fn read_images(paths: &[PathBuf]) -> Result<Vec<ImageUpload>> {
    paths.iter().map(|p| read_image(p)).collect()
}

fn read_image(path: &Path) -> Result<ImageUpload> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image.jpg".to_string());
    Ok(ImageUpload::new(file_name, bytes))
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn confirm(label: &str) -> Result<bool> {
    let answer = prompt(label)?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}
