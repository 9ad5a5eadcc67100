use super::Email;

const BRAND: &str = "ParkPass";

/// Password reset code, HTML with a plain-text alternative.
pub fn password_reset_otp(to: &str, user_name: &str, otp: &str, ttl_minutes: i64) -> Email {
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>{BRAND} - Password Reset OTP</title>
</head>
<body style="font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.6; color: #333; background: #f4f5fb; padding: 20px;">
    <div style="max-width: 600px; margin: 0 auto; background: #fff; border-radius: 20px; overflow: hidden;">
        <div style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 40px 30px; text-align: center; color: #fff;">
            <div style="font-size: 32px; font-weight: bold;">{BRAND}</div>
            <div style="font-size: 16px; opacity: 0.9;">Park Booking System</div>
        </div>
        <div style="padding: 40px 30px; text-align: center;">
            <h2 style="margin-bottom: 20px;">Hello {user_name}!</h2>
            <p style="color: #666;">We received a request to reset your password. Use the code below to continue.</p>
            <div style="background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); border-radius: 15px; padding: 30px; margin: 30px 0;">
                <div style="color: #fff; font-size: 18px; font-weight: 600;">Your OTP Code</div>
                <div style="font-size: 48px; font-weight: bold; color: #fff; letter-spacing: 8px; font-family: 'Courier New', monospace;">{otp}</div>
            </div>
            <div style="background: #fff3cd; border-radius: 10px; padding: 15px; color: #856404;">
                This code expires in <strong>{ttl_minutes} minutes</strong>.
            </div>
            <div style="background: #f8d7da; border-radius: 10px; padding: 15px; margin-top: 20px; color: #721c24;">
                If you didn't request a password reset, ignore this email and your account stays secure.
            </div>
        </div>
        <div style="background: #f8f9fa; padding: 30px; text-align: center; color: #6c757d; font-size: 14px;">
            This email was sent by {BRAND}. Never share this code with anyone.
        </div>
    </div>
</body>
</html>"#,
        user_name = escape_html(user_name),
    );

    let text = format!(
        "Hello {user_name},\n\nYour {BRAND} password reset code is {otp}. \
         It expires in {ttl_minutes} minutes.\n\n\
         If you didn't request a password reset, ignore this email."
    );

    Email {
        to: to.to_string(),
        subject: format!("{BRAND} Password Reset OTP"),
        html,
        text,
    }
}

fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_email_contains_code_and_expiry() {
        let email = password_reset_otp("a@example.com", "Asha", "482913", 10);
        assert_eq!(email.to, "a@example.com");
        assert!(email.html.contains("482913"));
        assert!(email.html.contains("10 minutes"));
        assert!(email.text.contains("482913"));
    }

    #[test]
    fn test_user_name_is_escaped() {
        let email = password_reset_otp("a@example.com", "<script>", "111111", 10);
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;"));
    }
}
