// Object storage commands

use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fiacloud_lib::services::storage::manager::is_text_file;
use fiacloud_lib::services::storage::{build_tree, ProgressFn, StorageError, StorageService};
use fiacloud_lib::utils::object_key;

use crate::context::AppContext;
use crate::output::{format_size, render_listing, render_tree};

/// Library errors carry a user-facing message
fn user_error(err: StorageError) -> anyhow::Error {
    anyhow!(err.to_user_message())
}

pub async fn list(ctx: &AppContext, prefix: Option<&str>, tree: bool, json: bool) -> Result<()> {
    let files = ctx.files()?;
    let mut listing = files.list_files().await.map_err(user_error)?;
    if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
        listing.retain(|f| f.name.starts_with(prefix));
    }

    match (tree, json) {
        (true, true) => println!("{}", serde_json::to_string_pretty(&build_tree(&listing))?),
        (true, false) => print!("{}", render_tree(&build_tree(&listing))),
        (false, true) => println!("{}", serde_json::to_string_pretty(&listing)?),
        (false, false) => print!("{}", render_listing(&listing)),
    }
    Ok(())
}

pub async fn upload(
    ctx: &AppContext,
    file: &Path,
    folder: Option<&str>,
    name: Option<&str>,
) -> Result<()> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let name = match name {
        Some(name) => name.to_string(),
        None => file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("{} has no file name", file.display()))?,
    };

    let size = data.len() as u64;
    let report: &ProgressFn<'_> =
        &|percent: u8| log::info!("[cli] Uploading {}: {}%", name, percent);
    let key = ctx
        .files()?
        .upload_file(&name, data, folder, Some(report))
        .await
        .map_err(user_error)?;
    println!("Uploaded {} ({})", key, format_size(size));
    Ok(())
}

pub async fn download(ctx: &AppContext, key: &str, output: Option<&Path>) -> Result<()> {
    let files = ctx.files()?;
    let bytes = files
        .storage()
        .get_bytes(key)
        .await
        .map_err(user_error)?;
    let target = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| object_key::file_name(key).into());
    tokio::fs::write(&target, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", target.display()))?;
    println!("Saved {} to {} ({})", key, target.display(), format_size(bytes.len() as u64));
    Ok(())
}

pub async fn cat(ctx: &AppContext, key: &str) -> Result<()> {
    if !is_text_file(key) {
        log::warn!("[cli] {} does not look like a text file", key);
    }
    let content = ctx
        .files()?
        .get_file_content(key)
        .await
        .map_err(user_error)?;
    print!("{}", content);
    Ok(())
}

pub async fn put(ctx: &AppContext, key: &str, file: Option<&Path>) -> Result<()> {
    let content = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    ctx.files()?
        .save_file_content(key, &content)
        .await
        .map_err(user_error)?;
    println!("Saved {}", key);
    Ok(())
}

pub async fn remove(ctx: &AppContext, key: &str) -> Result<()> {
    ctx.files()?.delete_file(key).await.map_err(user_error)?;
    println!("Deleted {}", key);
    Ok(())
}

pub async fn remove_folder(ctx: &AppContext, folder: &str) -> Result<()> {
    let count = ctx
        .files()?
        .delete_folder(folder)
        .await
        .map_err(user_error)?;
    println!("Deleted folder {} ({} objects)", folder.trim_matches('/'), count);
    Ok(())
}

pub async fn rename(ctx: &AppContext, from: &str, to: &str) -> Result<()> {
    ctx.files()?
        .rename_file(from, to)
        .await
        .map_err(user_error)?;
    println!("Renamed {} -> {}", from, to);
    Ok(())
}

pub async fn mkdir(ctx: &AppContext, name: &str, parent: Option<&str>) -> Result<()> {
    let folder = ctx
        .files()?
        .create_folder(name, parent)
        .await
        .map_err(user_error)?;
    println!("Created folder {}", folder);
    Ok(())
}

pub async fn touch(
    ctx: &AppContext,
    name: &str,
    parent: Option<&str>,
    content: &str,
) -> Result<()> {
    let key = ctx
        .files()?
        .create_text_file(name, parent, content)
        .await
        .map_err(user_error)?;
    println!("Created {}", key);
    Ok(())
}

pub async fn url(ctx: &AppContext, key: &str) -> Result<()> {
    let url = ctx.files()?.get_file_url(key).await.map_err(user_error)?;
    println!("{}", url);
    Ok(())
}
