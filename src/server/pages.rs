use crate::core::render::html_escape;
use chrono::Datelike;
use std::fmt::Write;

const FIRST_REPORT_YEAR: i32 = 2024;

/// Years offered by the forms: the first report year up to six years ahead.
pub fn selectable_years() -> Vec<i32> {
    let this_year = chrono::Local::now().year().max(FIRST_REPORT_YEAR);
    (FIRST_REPORT_YEAR..=this_year + 6).collect()
}

fn options<T: AsRef<str>>(output: &mut String, values: &[T]) {
    for value in values {
        let value = html_escape(value.as_ref());
        let _ = writeln!(output, "<option value=\"{value}\">{value}</option>");
    }
}

/// Upload form plus the "view existing report" form.
///
/// The upload posts the raw file as the request body, the other fields go
/// into the query string.
pub fn index_page(prefixes: &[String], years: &[i32]) -> String {
    let years: Vec<String> = years.iter().map(i32::to_string).collect();
    let mut output = String::with_capacity(4096);

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html><head><meta charset=\"utf-8\" /><title>Case bubble maps</title></head>");
    let _ = writeln!(output, "<body>");
    let _ = writeln!(output, "<h1>Upload case file</h1>");
    let _ = writeln!(output, "<form id=\"upload\">");
    let _ = writeln!(output, "<input type=\"file\" name=\"file\" accept=\".csv\" required />");
    let _ = writeln!(output, "<input type=\"text\" name=\"case_type\" placeholder=\"Case type\" required />");
    let _ = writeln!(output, "<select name=\"prefix\">");
    options(&mut output, prefixes);
    let _ = writeln!(output, "</select>");
    let _ = writeln!(output, "<input type=\"text\" name=\"month\" placeholder=\"Month\" required />");
    let _ = writeln!(output, "<select name=\"year\">");
    options(&mut output, &years);
    let _ = writeln!(output, "</select>");
    let _ = writeln!(output, "<input type=\"number\" name=\"min_count\" value=\"2\" required />");
    let _ = writeln!(output, "<button type=\"submit\">Upload</button>");
    let _ = writeln!(output, "</form>");

    let _ = writeln!(output, "<h1>View existing report</h1>");
    let _ = writeln!(output, "<form method=\"post\" action=\"/view_existing_files\">");
    let _ = writeln!(output, "<input type=\"text\" name=\"case_type_view\" placeholder=\"Case type\" required />");
    let _ = writeln!(output, "<select name=\"existing_prefix\">");
    options(&mut output, prefixes);
    let _ = writeln!(output, "</select>");
    let _ = writeln!(output, "<input type=\"text\" name=\"existing_month\" placeholder=\"Month\" required />");
    let _ = writeln!(output, "<select name=\"existing_year\">");
    options(&mut output, &years);
    let _ = writeln!(output, "</select>");
    let _ = writeln!(output, "<button type=\"submit\">View</button>");
    let _ = writeln!(output, "</form>");

    let _ = writeln!(
        output,
        r#"<script>
document.getElementById("upload").addEventListener("submit", async (event) => {{
  event.preventDefault();
  const form = event.target;
  const file = form.file.files[0];
  const params = new URLSearchParams({{
    file_name: file ? file.name : "",
    case_type: form.case_type.value,
    prefix: form.prefix.value,
    month: form.month.value,
    year: form.year.value,
    min_count: form.min_count.value,
  }});
  const response = await fetch("/upload_file?" + params, {{ method: "POST", body: file }});
  const body = await response.text();
  document.open();
  document.write(response.ok ? body : "<pre>" + body.replace(/</g, "&lt;") + "</pre>");
  document.close();
}});
</script>"#
    );
    let _ = writeln!(output, "</body></html>");
    output
}
