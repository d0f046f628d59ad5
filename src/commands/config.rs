use crate::database::DatabaseManager;
use crate::errors::AppError;
use crate::settings::models::Setting;

/// Shows settings, optionally updating one first.
///
/// With `name` only that setting is returned; with `name` and `value` the
/// setting is updated before being returned.
pub async fn config(
    db: &DatabaseManager,
    name: Option<&str>,
    value: Option<&str>,
) -> Result<Vec<Setting>, AppError> {
    let settings = db.settings();

    match (name, value) {
        (Some(name), Some(value)) => settings.set_setting(name, value).await?,
        (None, Some(_)) => {
            return Err(AppError::Internal(
                "a setting value needs a setting name".to_string(),
            ))
        }
        _ => {}
    }

    let all = settings.list_settings().await?;

    match name {
        None => Ok(all),
        Some(name) => {
            let matching: Vec<Setting> = all.into_iter().filter(|s| s.name == name).collect();
            if matching.is_empty() {
                return Err(AppError::SettingNotFound(name.to_string()));
            }
            Ok(matching)
        }
    }
}

pub fn render_settings(settings: &[Setting]) -> String {
    let mut out = String::new();
    out.push_str("Name                  Value\n");
    out.push_str("===================== ============================\n");

    for setting in settings {
        out.push_str(&format!("{:>21} {}\n", setting.name, setting.value));
    }
    out
}
