use std::collections::HashMap;

pub(crate) const SERVICE_NAME: &str = "pincard";

fn attributes(api_url: &str) -> HashMap<&str, &str> {
    let mut attrs = HashMap::new();
    attrs.insert("service", SERVICE_NAME);
    attrs.insert("server", api_url);
    attrs
}

/// Store the API token for `api_url` in the system keyring via Secret Service.
pub async fn store_token(api_url: &str, token: &str) -> Result<(), String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    keyring
        .create_item(
            &format!("Pincard token ({})", api_url),
            &attributes(api_url),
            token.as_bytes(),
            true, // replace existing
        )
        .await
        .map_err(|e| format!("Failed to store token: {}", e))?;

    Ok(())
}

/// Load the API token for `api_url`, if one was stored.
pub async fn load_token(api_url: &str) -> Result<Option<String>, String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    let items = keyring
        .search_items(&attributes(api_url))
        .await
        .map_err(|e| format!("Failed to search keyring: {}", e))?;

    let Some(item) = items.first() else {
        return Ok(None);
    };
    let secret = item
        .secret()
        .await
        .map_err(|e| format!("Failed to read secret: {}", e))?;
    let token = String::from_utf8(secret.to_vec())
        .map_err(|e| format!("Invalid UTF-8 in token: {}", e))?;
    Ok(Some(token).filter(|t| !t.is_empty()))
}

/// Remove any stored token for `api_url`.
pub async fn delete_token(api_url: &str) -> Result<(), String> {
    let keyring = oo7::Keyring::new()
        .await
        .map_err(|e| format!("Failed to connect to keyring: {}", e))?;

    let items = keyring
        .search_items(&attributes(api_url))
        .await
        .map_err(|e| format!("Failed to search keyring: {}", e))?;

    for item in items {
        item.delete()
            .await
            .map_err(|e| format!("Failed to delete token: {}", e))?;
    }

    Ok(())
}
