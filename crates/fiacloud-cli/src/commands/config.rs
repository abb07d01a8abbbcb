// Settings commands

use anyhow::{bail, Result};
use fiacloud_lib::models::{
    AIConfigData, OssConfigData, R2ConfigData, StorageProvider, DEFAULT_AI_BASE_URL,
    DEFAULT_AI_MODEL, OSS_REGIONS,
};
use fiacloud_lib::repositories::Theme;
use fiacloud_lib::services::ai::create_provider;

use crate::context::AppContext;

pub enum ClearTarget {
    Storage(StorageProvider),
    Ai,
}

/// Keep the first and last few characters of a secret
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}

pub fn show(ctx: &AppContext) -> Result<()> {
    let config = &ctx.config;
    println!("Active provider: {}", config.active_provider());

    match config.load_oss_config() {
        Some(oss) => println!(
            "Aliyun OSS:      bucket={} region={} endpoint={} key={}",
            oss.bucket,
            oss.region,
            oss.endpoint_host(),
            mask(&oss.access_key_id)
        ),
        None => println!("Aliyun OSS:      not configured"),
    }
    match config.load_r2_config() {
        Some(r2) => println!(
            "Cloudflare R2:   bucket={} account={} domain={} key={}",
            r2.bucket,
            r2.account_id,
            r2.custom_domain.as_deref().unwrap_or("-"),
            mask(&r2.access_key_id)
        ),
        None => println!("Cloudflare R2:   not configured"),
    }
    match config.load_ai_config() {
        Some(ai) => println!(
            "AI:              {} model={} key={}",
            ai.base_url,
            ai.model,
            mask(&ai.api_key)
        ),
        None => println!("AI:              not configured"),
    }
    println!("Theme:           {}", config.theme().as_str());
    println!(
        "Access password: {}",
        if ctx.auth().is_protected()? { "set" } else { "none" }
    );
    Ok(())
}

pub fn set_aliyun(
    ctx: &AppContext,
    access_key_id: String,
    access_key_secret: String,
    bucket: String,
    region: String,
    endpoint: Option<String>,
) -> Result<()> {
    if !OSS_REGIONS.iter().any(|(id, _)| *id == region) {
        log::warn!("[cli] {} is not a known OSS region", region);
    }
    let mut oss = OssConfigData::new(access_key_id, access_key_secret, bucket, region);
    if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
        oss.endpoint = endpoint;
    }
    ctx.config.save_oss_config(&oss)?;
    ctx.config.set_active_provider(StorageProvider::Aliyun)?;
    println!("Saved Aliyun OSS settings for bucket {}", oss.bucket);
    Ok(())
}

pub fn set_r2(
    ctx: &AppContext,
    account_id: String,
    access_key_id: String,
    access_key_secret: String,
    bucket: String,
    custom_domain: Option<String>,
) -> Result<()> {
    let r2 = R2ConfigData {
        account_id,
        access_key_id,
        access_key_secret,
        bucket,
        custom_domain: custom_domain.filter(|d| !d.trim().is_empty()),
    };
    ctx.config.save_r2_config(&r2)?;
    ctx.config.set_active_provider(StorageProvider::R2)?;
    println!("Saved Cloudflare R2 settings for bucket {}", r2.bucket);
    Ok(())
}

pub fn set_ai(
    ctx: &AppContext,
    base_url: Option<String>,
    api_key: String,
    model: Option<String>,
) -> Result<()> {
    let ai = AIConfigData::new(
        base_url.unwrap_or_else(|| DEFAULT_AI_BASE_URL.to_string()),
        api_key,
        model.unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
    );
    // Validate before persisting
    if let Err(e) = create_provider(ai.clone()) {
        bail!(e.to_user_message());
    }
    ctx.config.save_ai_config(&ai)?;
    println!("Saved AI settings ({} via {})", ai.model, ai.base_url);
    Ok(())
}

pub fn set_provider(ctx: &AppContext, provider: StorageProvider) -> Result<()> {
    let configured = match provider {
        StorageProvider::Aliyun => ctx.config.load_oss_config().is_some(),
        StorageProvider::R2 => ctx.config.load_r2_config().is_some(),
    };
    ctx.config.set_active_provider(provider)?;
    if configured {
        println!("Active provider is now {}", provider);
    } else {
        println!(
            "Active provider is now {} (not configured yet, run `fiacloud config storage {}`)",
            provider, provider
        );
    }
    Ok(())
}

pub fn clear(ctx: &AppContext, target: ClearTarget) -> Result<()> {
    match target {
        ClearTarget::Storage(provider) => {
            ctx.config.clear_storage_config(provider)?;
            println!("Cleared {} settings", provider);
        }
        ClearTarget::Ai => {
            ctx.config.clear_ai_config()?;
            println!("Cleared AI settings");
        }
    }
    Ok(())
}

/// Set the theme, or step to the next one when none is given
pub fn set_theme(ctx: &AppContext, theme: Option<Theme>) -> Result<()> {
    let theme = theme.unwrap_or_else(|| ctx.config.theme().cycle());
    ctx.config.set_theme(theme)?;
    println!("Theme is now {}", theme.as_str());
    Ok(())
}

pub fn regions() {
    for (id, label) in OSS_REGIONS {
        println!("{:<22} {}", id, label);
    }
}
