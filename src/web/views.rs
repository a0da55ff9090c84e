//! HTML views
//!
//! Small string-built pages; every interpolated value goes through `escape`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::models::{CheckOutcome, StatusRecord};
use crate::services::snapshot;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; margin: 2rem; }}
table {{ border-collapse: collapse; }}
td, th {{ border: 1px solid #ccc; padding: 4px 8px; }}
.selected {{ color: #070; font-weight: bold; }}
.error {{ color: #a00; }}
</style>
</head>
<body>
{body}
</body>
</html>"#,
        title = escape(title),
        body = body
    )
}

/// Record list, optionally narrowed to one program year
pub fn index(records: &[StatusRecord], years: &[String], selected_year: Option<&str>) -> String {
    let mut body = String::from("<h1>DV status</h1>\n<p><a href=\"/user/create\">Add applicant</a></p>\n");

    body.push_str("<p>Year: <a href=\"/\">all</a>");
    for year in years {
        if Some(year.as_str()) == selected_year {
            body.push_str(&format!(" <strong>{}</strong>", escape(year)));
        } else {
            body.push_str(&format!(" <a href=\"/?year={0}\">{0}</a>", escape(year)));
        }
    }
    body.push_str("</p>\n");

    body.push_str(
        "<table>\n<tr><th>Last name</th><th>Confirmation</th><th>Birth year</th>\
         <th>Result</th><th>Checked</th><th></th></tr>\n",
    );
    for record in records {
        body.push_str(&row(record));
    }
    body.push_str("</table>\n");

    layout("DV status", &body)
}

fn row(record: &StatusRecord) -> String {
    let result = match record.check_result {
        CheckOutcome::Unknown => "-".to_string(),
        CheckOutcome::Selected => format!(
            "<span class=\"selected\">{}</span>",
            record.check_result.label()
        ),
        CheckOutcome::Denied => record.check_result.label().to_string(),
    };
    // a failed later cycle leaves the previous screenshot behind; hide it
    let last_update = record.last_update.filter(|_| record.check_result.is_known());
    let checked = match (last_update, &record.screenshot) {
        (Some(at), Some(_)) => format!(
            "<a href=\"/user/screenshot/{}\">{}</a>",
            record.user_id,
            at.format("%Y-%m-%d %H:%M UTC")
        ),
        (Some(at), None) => at.format("%Y-%m-%d %H:%M UTC").to_string(),
        _ => "never".to_string(),
    };

    format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
         <td><a href=\"/check/{}\">check</a></td></tr>\n",
        escape(&record.lastname),
        escape(&record.confirmation_number),
        escape(&record.birth_year),
        result,
        checked,
        record.user_id
    )
}

/// Applicant creation form
pub fn user_form(error: Option<&str>) -> String {
    let error = error
        .map(|e| format!("<p class=\"error\">{}</p>\n", escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"<h1>Add applicant</h1>
{error}<form method="post" action="/user/create">
<p><label>Last name <input name="lastname" required></label></p>
<p><label>Confirmation number <input name="confirmation_number" required></label></p>
<p><label>Birth year <input name="birth_year" required pattern="\d{{4}}"></label></p>
<p><button type="submit">Save</button></p>
</form>
<p><a href="/">back</a></p>"#,
        error = error
    );
    layout("Add applicant", &body)
}

/// CAPTCHA prompt for a running cycle
pub fn captcha(record: &StatusRecord) -> String {
    let image = record.captcha_image.as_deref().unwrap_or_default();
    let body = format!(
        r#"<h1>{name} ({confirmation})</h1>
<p><img alt="captcha" src="data:{mime};base64,{data}"></p>
<form method="post" action="/check/{id}">
<p><label>Code <input name="captcha" autofocus required autocomplete="off"></label></p>
<p><button type="submit">Submit</button></p>
</form>"#,
        name = escape(&record.lastname),
        confirmation = escape(&record.confirmation_number),
        mime = snapshot::mime_type(image),
        data = STANDARD.encode(image),
        id = record.user_id
    );
    layout("CAPTCHA", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record() -> StatusRecord {
        StatusRecord {
            user_id: 7,
            lastname: "<Doe>".into(),
            confirmation_number: "2024012345678".into(),
            birth_year: "1990".into(),
            ..Default::default()
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn index_lists_records_and_year_links() {
        let mut checked = record();
        checked.check_result = CheckOutcome::Selected;
        checked.last_update = Some(Utc::now());
        checked.screenshot = Some(vec![1]);

        let html = index(
            &[record(), checked],
            &["2024".to_string(), "2025".to_string()],
            Some("2024"),
        );
        assert!(html.contains("&lt;Doe&gt;"));
        assert!(!html.contains("<Doe>"));
        assert!(html.contains("<strong>2024</strong>"));
        assert!(html.contains("href=\"/?year=2025\""));
        assert!(html.contains("/user/screenshot/7"));
        assert!(html.contains("href=\"/check/7\""));
    }

    #[test]
    fn stale_screenshot_hidden_while_outcome_unknown() {
        let mut failed_rerun = record();
        failed_rerun.last_update = Some(Utc::now());
        failed_rerun.screenshot = Some(vec![1]);

        let html = index(&[failed_rerun], &[], None);
        assert!(!html.contains("/user/screenshot/7"));
        assert!(html.contains("never"));
    }

    #[test]
    fn captcha_page_embeds_image() {
        let mut r = record();
        r.captcha_image = Some(b"\x89PNG\r\n\x1a\n".to_vec());
        let html = captcha(&r);
        assert!(html.contains("data:image/png;base64,iVBORw0KGgo="));
        assert!(html.contains("action=\"/check/7\""));
    }
}
