//! Message rendering. Pure formatting, no I/O.

/// Direct support contact shown in user-facing fallbacks.
pub const SUPPORT_EMAIL: &str = "info@am-robots.com";
pub const SUPPORT_PHONE: &str = "+45 8140 1221";

/// HTML body of the resolution email.
#[must_use]
pub fn resolution_email_html(username: &str, task_number: &str, response_text: &str) -> String {
    let username = html_escape(username);
    let response = html_escape(response_text).replace('\n', "<br>");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            line-height: 1.6;
            color: #333;
            max-width: 600px;
            margin: 0 auto;
            padding: 20px;
        }}
        .header {{
            background: #2563eb;
            color: white;
            padding: 20px;
            border-radius: 8px;
            text-align: center;
        }}
        .info-box {{
            background-color: #eff6ff;
            border-left: 4px solid #2563eb;
            padding: 15px;
            margin: 20px 0;
            border-radius: 4px;
        }}
        .task-number {{
            font-size: 18px;
            font-weight: 700;
            color: #2563eb;
            font-family: 'Courier New', monospace;
        }}
        .response-box {{
            background-color: #f0fdf4;
            border: 1px solid #86efac;
            border-radius: 8px;
            padding: 20px;
            margin: 25px 0;
        }}
        .response-title {{
            color: #059669;
            font-size: 18px;
            font-weight: 600;
            margin-bottom: 15px;
        }}
        .footer {{
            margin-top: 30px;
            padding-top: 20px;
            border-top: 2px solid #e5e7eb;
            color: #6b7280;
            font-size: 14px;
        }}
    </style>
</head>
<body>
    <div class="header">
        <h2>Support Case Resolved</h2>
    </div>

    <p>Dear <strong>{username}</strong>,</p>

    <p>We're pleased to inform you that your support case has been resolved by our technical team.</p>

    <div class="info-box">
        <div>Tracking Number</div>
        <div class="task-number">{task_number}</div>
    </div>

    <div class="response-box">
        <div class="response-title">Support Team Response</div>
        <div>{response}</div>
    </div>

    <div class="footer">
        <p>If you need further assistance, contact us:</p>
        <p>Email: {SUPPORT_EMAIL}<br>Phone: {SUPPORT_PHONE}</p>
        <p>Best regards,<br><strong>The Support Team</strong></p>
    </div>
</body>
</html>
"#
    )
}

/// Plain-text alternative of the resolution email.
#[must_use]
pub fn resolution_email_text(username: &str, task_number: &str, response_text: &str) -> String {
    format!(
        "Dear {username},\n\n\
         Your support case {task_number} has been resolved.\n\n\
         Support Team Response:\n{response_text}\n\n\
         If you need further assistance, contact us:\n\
         Email: {SUPPORT_EMAIL}\n\
         Phone: {SUPPORT_PHONE}\n\n\
         Best regards,\n\
         The Support Team\n"
    )
}

/// In-chat resolution message, shown while the session is still live.
#[must_use]
pub fn chat_resolution_message(task_number: &str, response_text: &str) -> String {
    format!(
        "✅ **Your support case has been resolved!**\n\n\
         📋 **Tracking number:** `{task_number}`\n\n\
         **Support team response:**\n\n\
         {response_text}\n\n\
         ---\n\
         If you have any further questions, feel free to ask!"
    )
}

/// Shown when portal submission fails. The case was not created.
#[must_use]
pub fn submission_failed_message() -> String {
    format!(
        "❌ **Submission failed**\n\n\
         An error occurred while submitting your case to the support system.\n\
         Please try again, or contact support directly:\n\n\
         - Email: {SUPPORT_EMAIL}\n\
         - Phone: {SUPPORT_PHONE}"
    )
}

/// Shown when a status lookup cannot be interpreted.
#[must_use]
pub fn status_unknown_message(task_number: &str) -> String {
    format!(
        "The current status of case `{task_number}` could not be determined. \
         Please try again later or contact support at {SUPPORT_EMAIL}."
    )
}

/// Minimal HTML entity escaping for text interpolated into templates.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
