//! HTML Views
//!
//! Server-rendered pages. Every user-supplied value goes through [`escape`].

use data_validator::{
    ClinicalForm, ValidationResult, CP_CHOICES, RESTECG_CHOICES, SEX_CHOICES, YES_NO_CHOICES,
};
use inference_engine::{Diagnosis, Prediction, RiskLevel};
use storage::PredictionRecord;

/// Escape text for HTML element content and quoted attributes
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// A one-line notice shown above page content
#[derive(Debug, Clone, Copy)]
pub enum Notice<'a> {
    Info(&'a str),
    Success(&'a str),
    Warning(&'a str),
    Danger(&'a str),
}

impl Notice<'_> {
    fn render(&self) -> String {
        let (class, text) = match self {
            Notice::Info(t) => ("info", t),
            Notice::Success(t) => ("success", t),
            Notice::Warning(t) => ("warning", t),
            Notice::Danger(t) => ("danger", t),
        };
        format!(r#"<div class="alert alert-{class}">{}</div>"#, escape(text))
    }
}

fn layout(title: &str, username: Option<&str>, notices: &[Notice<'_>], body: &str) -> String {
    let nav = match username {
        Some(name) => format!(
            concat!(
                r#"<a href="/home">Home</a> <a href="/prediction">Risk Assessment</a> "#,
                r#"<span class="user">{}</span> <a href="/logout">Log out</a>"#,
            ),
            escape(name)
        ),
        None => r#"<a href="/login">Log in</a> <a href="/register">Register</a>"#.to_string(),
    };
    let notices: String = notices.iter().map(Notice::render).collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - Heartwise</title>
</head>
<body>
<nav>{nav}</nav>
<main>
{notices}
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

fn field_errors(errors: Option<&ValidationResult>, field: &str) -> String {
    errors
        .map(|result| {
            result
                .errors_for(field)
                .iter()
                .map(|e| {
                    format!(
                        r#"<div class="invalid-feedback">{}</div>"#,
                        escape(&e.to_string())
                    )
                })
                .collect()
        })
        .unwrap_or_default()
}

fn text_input(
    label: &str,
    name: &str,
    kind: &str,
    value: Option<&str>,
    errors: Option<&ValidationResult>,
) -> String {
    format!(
        r#"<label for="{name}">{label}</label>
<input id="{name}" name="{name}" type="{kind}" value="{value}">
{errors}"#,
        label = escape(label),
        value = escape(value.unwrap_or_default()),
        errors = field_errors(errors, name),
    )
}

fn select_input(
    label: &str,
    name: &str,
    choices: &[(&str, &str)],
    selected: Option<&str>,
    errors: Option<&ValidationResult>,
) -> String {
    let mut options = String::new();
    for (value, text) in choices {
        let mark = if selected == Some(*value) { " selected" } else { "" };
        options.push_str(&format!(
            r#"<option value="{value}"{mark}>{text}</option>"#
        ));
    }
    format!(
        r#"<label for="{name}">{label}</label>
<select id="{name}" name="{name}">{options}</select>
{errors}"#,
        label = escape(label),
        errors = field_errors(errors, name),
    )
}

/// Login page
pub fn login_page(
    next: Option<&str>,
    notices: &[Notice<'_>],
    errors: Option<&ValidationResult>,
) -> String {
    let action = match next {
        Some(target) => {
            let query = serde_urlencoded::to_string([("next", target)]).unwrap_or_default();
            format!("/login?{query}")
        }
        None => "/login".to_string(),
    };
    let body = format!(
        r#"<h1>Log in</h1>
<form method="post" action="{action}">
{username}
{password}
<button type="submit">Log in</button>
</form>
<p>No account? <a href="/register">Register</a></p>"#,
        action = escape(&action),
        username = text_input("Username", "username", "text", None, errors),
        password = text_input("Password", "password", "password", None, errors),
    );
    layout("Log in", None, notices, &body)
}

/// Registration page
pub fn register_page(
    username: Option<&str>,
    notices: &[Notice<'_>],
    errors: Option<&ValidationResult>,
) -> String {
    let body = format!(
        r#"<h1>Register</h1>
<form method="post" action="/register">
{username}
{password}
{confirm}
<button type="submit">Register</button>
</form>
<p>Already registered? <a href="/login">Log in</a></p>"#,
        username = text_input("Username", "username", "text", username, errors),
        password = text_input("Password", "password", "password", None, errors),
        confirm = text_input("Confirm Password", "confirm_password", "password", None, errors),
    );
    layout("Register", None, notices, &body)
}

/// Landing page after login
pub fn home_page(username: &str, notices: &[Notice<'_>]) -> String {
    let body = format!(
        r#"<h1>Welcome, {name}</h1>
<p>Estimate your heart disease risk from ten routine clinical measurements.</p>
<p><a href="/prediction">Start a risk assessment</a></p>"#,
        name = escape(username),
    );
    layout("Home", Some(username), notices, &body)
}

/// Everything the prediction page shows
pub struct PredictionPage<'a> {
    pub username: &'a str,
    pub form: &'a ClinicalForm,
    pub errors: Option<&'a ValidationResult>,
    pub result: Option<&'a Prediction>,
    pub history: &'a [PredictionRecord],
    pub notices: &'a [Notice<'a>],
}

impl PredictionPage<'_> {
    pub fn render(&self) -> String {
        let mut body = String::from("<h1>Heart Disease Risk Assessment</h1>\n");
        if let Some(prediction) = self.result {
            body.push_str(&render_result(prediction));
        }
        body.push_str(&self.render_form());
        body.push_str(&render_history(self.history));
        layout("Risk Assessment", Some(self.username), self.notices, &body)
    }

    fn render_form(&self) -> String {
        let form = self.form;
        let errors = self.errors;
        let fields = [
            text_input("Age", "age", "number", form.age.as_deref(), errors),
            select_input("Sex", "sex", SEX_CHOICES, form.sex.as_deref(), errors),
            select_input("Chest Pain Type", "cp", CP_CHOICES, form.cp.as_deref(), errors),
            text_input(
                "Resting Blood Pressure (mm Hg)",
                "trestbps",
                "number",
                form.trestbps.as_deref(),
                errors,
            ),
            text_input(
                "Serum Cholesterol (mg/dl)",
                "chol",
                "number",
                form.chol.as_deref(),
                errors,
            ),
            select_input(
                "Fasting Blood Sugar > 120 mg/dl",
                "fbs",
                YES_NO_CHOICES,
                form.fbs.as_deref(),
                errors,
            ),
            select_input(
                "Resting ECG Results",
                "restecg",
                RESTECG_CHOICES,
                form.restecg.as_deref(),
                errors,
            ),
            text_input(
                "Maximum Heart Rate Achieved",
                "thalach",
                "number",
                form.thalach.as_deref(),
                errors,
            ),
            select_input(
                "Exercise Induced Angina",
                "exang",
                YES_NO_CHOICES,
                form.exang.as_deref(),
                errors,
            ),
            text_input(
                "ST Depression Induced by Exercise",
                "oldpeak",
                "text",
                form.oldpeak.as_deref(),
                errors,
            ),
        ];
        format!(
            r#"<form method="post" action="/prediction">
{}
<button type="submit">Predict</button>
</form>
"#,
            fields.join("\n")
        )
    }
}

fn render_result(prediction: &Prediction) -> String {
    let level = prediction.risk_level;
    format!(
        r#"<section class="result risk-{class}">
<h2>Result: {level}</h2>
<p>Prediction: {diagnosis}</p>
<p>Probability: {probability:.2}%</p>
<p>{advice}</p>
</section>
"#,
        class = risk_class(level),
        diagnosis = prediction.diagnosis.as_str(),
        probability = prediction.probability_percent(),
        advice = escape(level.advice()),
    )
}

fn risk_class(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "low",
        RiskLevel::Moderate => "moderate",
        RiskLevel::High => "high",
        RiskLevel::VeryHigh => "very-high",
    }
}

fn render_history(history: &[PredictionRecord]) -> String {
    if history.is_empty() {
        return "<p>No previous assessments.</p>\n".to_string();
    }

    let mut rows = String::new();
    for record in history {
        rows.push_str(&format!(
            concat!(
                "<tr><td>{date}</td><td>{age}</td><td>{diagnosis}</td>",
                "<td>{probability:.2}%</td><td>{level}</td></tr>\n",
            ),
            date = record.created_at.format("%Y-%m-%d %H:%M"),
            age = record.input.age,
            diagnosis = Diagnosis::from_label(record.prediction_result).as_str(),
            probability = record.probability * 100.0,
            level = escape(&record.risk_level),
        ));
    }

    format!(
        r#"<h2>Recent Assessments</h2>
<table>
<thead>
<tr><th>Date</th><th>Age</th><th>Prediction</th><th>Probability</th><th>Risk Level</th></tr>
</thead>
<tbody>
{rows}</tbody>
</table>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_validator::ValidationError;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#x27;y&#x27;&quot;)&lt;/script&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_home_escapes_username() {
        let html = home_page("<b>eve</b>", &[]);
        assert!(html.contains("&lt;b&gt;eve&lt;/b&gt;"));
        assert!(!html.contains("<b>eve</b>"));
    }

    #[test]
    fn test_login_keeps_next_target() {
        let notices = [Notice::Warning("Please log in to access this page.")];
        let html = login_page(Some("/prediction"), &notices, None);
        assert!(html.contains(r#"action="/login?next=%2Fprediction""#));
        assert!(html.contains("alert-warning"));
    }

    #[test]
    fn test_prediction_form_shows_errors_and_values() {
        let form = ClinicalForm {
            age: Some("5".to_string()),
            cp: Some("3".to_string()),
            ..ClinicalForm::default()
        };
        let errors = ValidationResult::invalid(
            vec![ValidationError::OutOfRange {
                field: "age",
                label: "Age",
                value: 5.0,
                min: 18.0,
                max: 100.0,
            }],
            10,
        );
        let html = PredictionPage {
            username: "alice",
            form: &form,
            errors: Some(&errors),
            result: None,
            history: &[],
            notices: &[],
        }
        .render();

        assert!(html.contains("Age must be between 18 and 100."));
        assert!(html.contains(r#"name="age" type="number" value="5""#));
        assert!(html.contains(r#"<option value="3" selected>Non-anginal Pain</option>"#));
        assert!(html.contains("No previous assessments."));
    }

    #[test]
    fn test_history_rows_render_each_record() {
        let record = PredictionRecord {
            id: 7,
            user_id: 1,
            input: feature_engine::ClinicalInput {
                age: 61,
                ..Default::default()
            },
            prediction_result: 1,
            probability: 0.8123,
            risk_level: "Very High Risk".to_string(),
            created_at: chrono::Utc::now(),
        };
        let html = render_history(&[record.clone(), record]);

        assert_eq!(html.matches("<tr><td>").count(), 2);
        assert!(html.contains(
            "<td>61</td><td>Positive</td><td>81.23%</td><td>Very High Risk</td>"
        ));
    }
}
