use shared::ProvisionStatus;

use crate::pipeline::Classification;

const TITLE: &str = "Fruit classifier";

const ABOUT_MODEL: &str = r#"<details class="about">
    <summary>About the model</summary>
    <p>A convolutional neural network trained on roughly 8,000 photos from the
    <a href="https://www.kaggle.com/chrisfilo/fruit-recognition" target="_blank">Fruit Recognition</a>
    dataset, about 3,000 per fruit. It tells apples, bananas and carambolas apart.</p>
    <p>10% of the data was held out as the test set and 20% used for validation.
    Images were resized to 150x150 pixel squares and the final model was trained for 52 epochs.</p>
</details>"#;

fn layout(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <link rel="stylesheet" href="/static/style.css">
</head>
<body>
<main>
    <h1>{title}</h1>
    <p>Classifies photos of fruit with a convolutional neural network.</p>
    {about}
{body}
</main>
</body>
</html>"#,
        title = TITLE,
        about = ABOUT_MODEL,
        body = body
    )
}

fn upload_form() -> &'static str {
    r#"<form class="upload" action="/classify" method="post" enctype="multipart/form-data">
    <label for="file">Select an image.</label>
    <input type="file" id="file" name="file" accept=".jpg,.jpeg,.png,image/jpeg,image/png" required>
    <button type="submit">Classify</button>
</form>"#
}

fn status_banner(status: &ProvisionStatus) -> String {
    if status.is_ready() {
        return String::new();
    }
    let class = match status {
        ProvisionStatus::Failed { .. } => "status error",
        _ => "status",
    };
    format!(
        r#"<p class="{}">{}</p>"#,
        class,
        escape_html(&status.describe())
    )
}

pub fn render_index(status: &ProvisionStatus) -> String {
    layout(&format!("{}\n{}", status_banner(status), upload_form()))
}

pub fn render_result(classification: &Classification) -> String {
    let rotation_note = match classification.rotation.degrees() {
        0 => String::new(),
        degrees => format!(
            r#"<p class="note">Rotated image {} degrees to match its orientation metadata.</p>"#,
            degrees
        ),
    };
    let preview = match &classification.preview {
        Some(uri) => format!(r#"<img src="{}" width="200" alt="Uploaded image">"#, uri),
        None => String::new(),
    };

    layout(&format!(
        r#"<section class="result">
    <h2>Uploaded image</h2>
    {rotation_note}
    {preview}
    {table}
</section>
{form}"#,
        rotation_note = rotation_note,
        preview = preview,
        table = classification.report.to_html(),
        form = upload_form()
    ))
}

pub fn render_error(message: &str) -> String {
    layout(&format!(
        r#"<p class="error">{}</p>
{}"#,
        escape_html(message),
        upload_form()
    ))
}

pub fn escape_html(text: &str) -> String {
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
