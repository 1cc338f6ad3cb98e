pub fn render_password_reset(username: &str, reset_url: &str, valid_minutes: i64) -> String {
    let username = escape(username);
    let validity = describe_minutes(valid_minutes);
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Password Reset</h2>
    <p>Hi {username},</p>
    <p>A password reset was requested for your Shopfront account.</p>
    <p><a href="{reset_url}" style="display: inline-block; padding: 10px 20px; background: #0070f3; color: white; text-decoration: none; border-radius: 4px;">Reset Password</a></p>
    <p>Or paste this link into your browser: {reset_url}</p>
    <p style="color: #666; font-size: 14px;">This link expires in {validity} and works once. If you didn't request this, you can ignore it.</p>
</body>
</html>"#
    )
}

pub fn password_reset_text(username: &str, reset_url: &str, valid_minutes: i64) -> String {
    format!(
        "Hi {username},\n\n\
         A password reset was requested for your Shopfront account.\n\
         Open this link to choose a new password:\n\n\
         {reset_url}\n\n\
         The link expires in {} and works once. If you didn't request this, you can ignore it.\n",
        describe_minutes(valid_minutes)
    )
}

fn describe_minutes(minutes: i64) -> String {
    match minutes {
        60 => "1 hour".to_string(),
        m if m > 60 && m % 60 == 0 => format!("{} hours", m / 60),
        1 => "1 minute".to_string(),
        m => format!("{m} minutes"),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
