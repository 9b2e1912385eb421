//! Terminal wizard: drives a `WizardController` from stdin.

use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::onboarding::model::Field;
use crate::onboarding::{WizardController, WizardSnapshot};

const HELP: &str = "\
Commands:
  set <field> <value>   edit a field (e.g. set fname Jane)
  confirm <password>    confirm the password
  send-otp              email a passcode
  verify-otp <code>     check the passcode
  verify-pan            check the PAN format
  next | back           move between steps
  submit                submit from the review step
  show                  print the current step
  fields                list field names
  quit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set(Field, String),
    SendOtp,
    VerifyOtp(String),
    VerifyPan,
    Next,
    Back,
    Submit,
    Show,
    Fields,
    Help,
    Quit,
}

impl std::str::FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match verb {
            "set" => {
                let (field, value) = rest.split_once(' ').unwrap_or((rest, ""));
                if field.is_empty() {
                    return Err("usage: set <field> <value>".to_string());
                }
                Ok(Self::Set(field.parse()?, value.trim().to_string()))
            }
            "confirm" => Ok(Self::Set(Field::ConfirmPassword, rest.to_string())),
            "send-otp" => Ok(Self::SendOtp),
            "verify-otp" if !rest.is_empty() => Ok(Self::VerifyOtp(rest.to_string())),
            "verify-otp" => Err("usage: verify-otp <code>".to_string()),
            "verify-pan" => Ok(Self::VerifyPan),
            "next" => Ok(Self::Next),
            "back" | "prev" => Ok(Self::Back),
            "submit" => Ok(Self::Submit),
            "show" => Ok(Self::Show),
            "fields" => Ok(Self::Fields),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}' (try 'help')")),
        }
    }
}

/// Render a snapshot as the text shown after each command.
pub fn render(snapshot: &WizardSnapshot) -> String {
    let mut out = format!(
        "Step {}/{}: {}",
        snapshot.step, snapshot.step_count, snapshot.title
    );
    if snapshot.section.is_terminal() {
        for (label, value) in snapshot.record.review_lines() {
            out.push_str(&format!("\n  {label:<18} {value}"));
        }
    }
    if let Some(notice) = &snapshot.notice {
        out.push_str(&format!("\n  {notice}"));
    }
    for (field, message) in snapshot.errors.iter() {
        out.push_str(&format!("\n  ! {field}: {message}"));
    }
    out
}

/// Execute one command. Returns `None` when the session should end.
pub async fn execute(wizard: &WizardController, command: Command) -> Option<String> {
    let text = match command {
        Command::Quit => return None,
        Command::Help => HELP.to_string(),
        Command::Fields => Field::ALL
            .iter()
            .map(|f| format!("{:<24} {}", f.name(), f.label()))
            .collect::<Vec<_>>()
            .join("\n"),
        Command::Show => render(&wizard.snapshot().await),
        Command::Set(field, value) => match wizard.set(field, &value).await {
            Ok(()) => format!("{field} updated"),
            Err(e) => e.to_string(),
        },
        Command::SendOtp => match wizard.send_otp().await {
            Ok(response) => response.message,
            Err(e) => e.to_string(),
        },
        Command::VerifyOtp(code) => match wizard.verify_otp(&code).await {
            Ok(response) => response.message,
            Err(e) => e.to_string(),
        },
        Command::VerifyPan => match wizard.verify_pan().await {
            Ok(response) => response.message,
            Err(e) => e.to_string(),
        },
        Command::Next => match wizard.next().await {
            Ok(_) => render(&wizard.snapshot().await),
            Err(errors) => format!(
                "Cannot continue: {} field(s) need attention\n{}",
                errors.len(),
                render(&wizard.snapshot().await)
            ),
        },
        Command::Back => {
            wizard.prev().await;
            render(&wizard.snapshot().await)
        }
        Command::Submit => match wizard.submit().await {
            Ok(outcome) => outcome.message(),
            Err(e) => e.to_string(),
        },
    };
    Some(text)
}

/// Read commands from stdin until EOF or `quit`.
pub async fn run(wizard: &WizardController) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    run_with(wizard, BufReader::new(tokio::io::stdin()), &mut stdout).await
}

/// Same as [`run`] over arbitrary input and output.
pub async fn run_with<R, W>(wizard: &WizardController, input: R, output: &mut W) -> std::io::Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    write_block(output, &render(&wizard.snapshot().await)).await?;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let text = match line.parse::<Command>() {
            Ok(command) => match execute(wizard, command).await {
                Some(text) => text,
                None => break,
            },
            Err(e) => e,
        };
        write_block(output, &text).await?;
    }
    Ok(())
}

async fn write_block<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.write_all(b"\n> ").await?;
    output.flush().await
}
