// Access password commands

use anyhow::{bail, Result};
use fiacloud_lib::services::auth::AuthError;

use crate::context::AppContext;

pub fn login(ctx: &AppContext, password: Option<&str>) -> Result<()> {
    let auth = ctx.auth();
    match auth.verify(password.unwrap_or("")) {
        Ok(()) => {
            if auth.is_protected()? {
                println!("Password accepted");
            } else {
                println!("No access password set");
            }
            Ok(())
        }
        Err(AuthError::CorruptPassword) => {
            bail!("Stored password could not be read; run `fiacloud reset` to start over")
        }
        Err(e) => bail!(e.to_user_message()),
    }
}

pub fn passwd(ctx: &AppContext, new_password: Option<String>) -> Result<()> {
    let removing = new_password.as_deref().map(str::is_empty).unwrap_or(true);
    ctx.auth().set_password(new_password)?;
    if removing {
        println!("Access password removed");
    } else {
        println!("Access password updated");
    }
    Ok(())
}

pub fn reset(ctx: &AppContext, confirmation: &str) -> Result<()> {
    ctx.auth().reset(confirmation)?;
    println!("All stored settings and conversations were cleared");
    Ok(())
}
