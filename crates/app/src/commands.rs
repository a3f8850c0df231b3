//! Subcommand handlers.

use std::error::Error;
use std::io::Write;

use prohero_application::{ApplicationError, LoginError, LoginFlow, LoginStep};
use prohero_domain::{UpdateProfileRequest, User, phone};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::time::Instant;
use tracing::warn;

use crate::cli::{Command, DutyAction, LoginArgs, ProfileArgs};
use crate::context::AppContext;

type CommandResult = Result<(), Box<dyn Error>>;

/// Failed code entries allowed before `login` gives up.
const MAX_OTP_ATTEMPTS: usize = 3;

/// Line-oriented answers to interactive questions.
pub struct Prompt<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Prompt<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Prints the question and reads one trimmed line; `None` at end of input.
    pub async fn ask(&mut self, question: &str) -> std::io::Result<Option<String>> {
        print!("{question} ");
        std::io::stdout().flush()?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }
}

/// Runs one subcommand.
pub async fn run<R: AsyncBufRead + Unpin>(
    command: Command,
    ctx: &AppContext,
    prompt: &mut Prompt<R>,
) -> CommandResult {
    match command {
        Command::Status => status(ctx).await,
        Command::Login(args) => login(ctx, args, prompt).await,
        Command::Duty { action } => duty(ctx, action).await,
        Command::Profile(args) => profile(ctx, args).await,
        Command::Bookings => bookings(ctx).await,
        Command::DeleteAccount { yes } => delete_account(ctx, yes, prompt).await,
        Command::Logout => logout(ctx).await,
    }
}

async fn require_session(ctx: &AppContext) -> CommandResult {
    if ctx.session.load().await.is_signed_in() {
        Ok(())
    } else {
        Err(ApplicationError::NotSignedIn.into())
    }
}

fn print_user(user: &User) {
    println!("Name:  {}", user.name);
    println!(
        "Phone: {} {}",
        phone::COUNTRY_CODE,
        phone::format_phone_display(&user.phone_number)
    );
    if let Some(email) = &user.email {
        println!("Email: {email}");
    }
}

async fn status(ctx: &AppContext) -> CommandResult {
    let state = ctx.session.load().await;
    println!("Session: {state}");
    if !state.is_signed_in() {
        return Ok(());
    }

    let snapshot = ctx.session.snapshot().await;
    if let Some(user) = &snapshot.user {
        print_user(user);
    }
    println!("Duty:  {}", snapshot.duty);

    let info = ctx.tokens.token_info().await;
    if let Some(expires_at) = info.expires_at {
        let remaining = info.expires_in_secs.unwrap_or_default();
        println!("Token expires {expires_at} ({remaining}s left)");
    }
    Ok(())
}

async fn login<R: AsyncBufRead + Unpin>(
    ctx: &AppContext,
    args: LoginArgs,
    prompt: &mut Prompt<R>,
) -> CommandResult {
    if !phone::is_valid_phone_number(&args.phone) {
        return Err(LoginError::InvalidPhone.into());
    }
    let mut flow = LoginFlow::new();
    flow.set_phone(&phone::format_phone_for_api(&args.phone));

    if flow.submit_phone(&ctx.auth).await? == LoginStep::Register {
        let name = match args.name {
            Some(name) => name,
            None => prompt
                .ask("New number. Enter your full name:")
                .await?
                .unwrap_or_default(),
        };
        flow.submit_name(&name)?;
    }

    println!(
        "Enter the 6-digit code sent to {} {} (or 'r' to resend).",
        phone::COUNTRY_CODE,
        flow.display_phone()
    );

    let mut attempts = 0;
    let mut last_tick = Instant::now();
    while attempts < MAX_OTP_ATTEMPTS {
        let Some(answer) = prompt.ask("OTP:").await? else {
            return Err("no code entered".into());
        };

        let elapsed = last_tick.elapsed().as_secs();
        for _ in 0..elapsed {
            flow.tick();
        }
        if elapsed > 0 {
            last_tick = Instant::now();
        }

        if answer.eq_ignore_ascii_case("r") {
            match flow.resend(&ctx.auth).await {
                Ok(()) => println!("A new code was sent."),
                Err(e @ (LoginError::ResendNotReady(_) | LoginError::Rejected(_))) => {
                    println!("{e}");
                }
                Err(e) => return Err(e.into()),
            }
            continue;
        }

        if let Err(e) = flow.set_code(&answer) {
            println!("{e}");
            continue;
        }

        match flow.verify(&ctx.auth, &ctx.session).await {
            Ok(user) => {
                println!("Welcome, {}.", user.name);
                return Ok(());
            }
            Err(LoginError::Rejected(message)) => {
                attempts += 1;
                println!("{message}");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err("too many failed attempts".into())
}

async fn duty(ctx: &AppContext, action: Option<DutyAction>) -> CommandResult {
    require_session(ctx).await?;
    let current = ctx.session.snapshot().await.duty;

    let wanted = match action {
        None => {
            println!("{current}");
            return Ok(());
        }
        Some(DutyAction::On) => true,
        Some(DutyAction::Off) => false,
        Some(DutyAction::Toggle) => !current.is_on_duty(),
    };

    if wanted == current.is_on_duty() {
        println!("Already {current}.");
        return Ok(());
    }
    let duty = ctx.session.toggle_duty_status().await?;
    println!("You are now {duty}.");
    Ok(())
}

async fn profile(ctx: &AppContext, args: ProfileArgs) -> CommandResult {
    require_session(ctx).await?;
    let update = UpdateProfileRequest {
        first_name: args.first_name,
        last_name: args.last_name,
        email: args.email,
    };

    let user = if update.is_empty() {
        ctx.session.fetch_user_profile().await?
    } else {
        let user = ctx.session.update_profile(&update).await?;
        println!("Profile updated.");
        user
    };
    print_user(&user);
    Ok(())
}

async fn bookings(ctx: &AppContext) -> CommandResult {
    require_session(ctx).await?;
    let response = ctx.users.get_bookings().await;
    if !response.success {
        return Err(ApplicationError::api(response.message, response.error).into());
    }
    let bookings = response.data.unwrap_or_default();

    if bookings.is_empty() {
        println!("No bookings.");
        return Ok(());
    }
    for booking in &bookings {
        println!("{}", serde_json::to_string_pretty(booking)?);
    }
    Ok(())
}

async fn delete_account<R: AsyncBufRead + Unpin>(
    ctx: &AppContext,
    yes: bool,
    prompt: &mut Prompt<R>,
) -> CommandResult {
    require_session(ctx).await?;
    if !yes {
        let answer = prompt
            .ask("Delete your account permanently? Type 'delete' to confirm:")
            .await?
            .unwrap_or_default();
        if answer != "delete" {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let response = ctx.users.delete_account().await;
    if !response.success {
        return Err(ApplicationError::api(response.message, response.error).into());
    }
    ctx.tokens.clear_tokens().await;
    if let Err(e) = ctx.session.logout().await {
        warn!(error = %e, "session not fully cleared after account deletion");
    }
    println!("Account deleted.");
    Ok(())
}

async fn logout(ctx: &AppContext) -> CommandResult {
    ctx.session.load().await;
    ctx.session.logout().await?;
    println!("Logged out.");
    Ok(())
}
