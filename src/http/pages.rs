//! HTML pages served by the handlers.
//!
//! Anything that came from a client or the filesystem is escaped before it is
//! placed in markup.

use std::fmt::Write as _;

use crate::storage::Entry;

const TITLE: &str = "TLS File Server";

/// Fixed body of the 403 answer to any method other than GET and POST.
pub const FORBIDDEN: &str =
    "<!DOCTYPE html><html lang=\"en\"><body><b>Only GET-AND-POST-Requests allowed!</b><hr /></body></html>";

/// Minimal HTML escaping for text and single- or double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn page(head_extra: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><link rel=\"icon\" type=\"image/x-icon\" href=\"/favicon.ico\"><title>{TITLE}</title>{head_extra}</head><body>{body}</body></html>"
    )
}

fn redirect_page(target: &str, heading: &str) -> String {
    let target = escape(target);
    page(
        &format!("<meta http-equiv='refresh' content='5;url={target}' />"),
        &format!(
            "<h2>{heading}</h2><pre>Page refresh in 5 seconds or click <a href='/list'>here</a>!</pre>"
        ),
    )
}

pub fn index() -> String {
    page(
        "",
        "<b>Welcome Guest</b><hr /><br /><a href='/list'>Show your files!</a><br /><br /><a href='/signup'>Sign Up</a>",
    )
}

pub fn signup() -> String {
    page(
        "",
        "<h2>Register a new user</h2>\
         <form action='/register' method='POST'>\
         <input type='text' name='txtUsername' placeholder='Username' />\
         <input type='password' name='txtPassword' placeholder='Password' />\
         <input type='submit' name='btnSubmit' value='Register' />\
         <input type='reset' name='btnReset' value='Reset' />\
         </form><hr /><br />\
         <pre>Registration is disabled. The server always reports success, but no account is created.</pre>",
    )
}

pub fn register_failed() -> String {
    page("", "<h2>Signup could not complete, an unknown error occurred!</h2>")
}

pub fn register_succeeded(back_to: &str) -> String {
    redirect_page(back_to, "Signup successful!")
}

/// Placeholder for routes with no behaviour yet.
pub fn not_available(what: &str) -> String {
    page("", &format!("<h2>{} is not available yet.</h2>", escape(what)))
}

pub fn not_found(path: &str) -> String {
    page("", &format!("<h2>Not found: {}</h2>", escape(path)))
}

pub fn download_not_found() -> String {
    page("", "<h2>Download file not found!</h2>")
}

pub fn upload_completed(back_to: &str) -> String {
    redirect_page(back_to, "Upload completed!")
}

pub fn upload_rejected(reason: &str) -> String {
    page(
        "",
        &format!(
            "<h2>Upload failed</h2><pre>{}</pre><a href='/list'>Back to your files</a>",
            escape(reason)
        ),
    )
}

/// Upload form plus one table row per entry, each with a download button.
pub fn listing(entries: &[Entry]) -> String {
    let mut rows = String::new();
    for entry in entries {
        let name = escape(&entry.name);
        // Writing to a String cannot fail.
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{name}</td><td>{} KB</td><td>{}</td><td>{}</td>\
             <td><form action='/download' method='POST'>\
             <input type='hidden' name='FilePath' value='{name}' />\
             <input type='submit' name='btnSubmit' value='Download' /></form></td></tr>",
            entry.kind.as_str(),
            entry.size_kb(),
            entry.created_at,
            entry.modified_at,
        );
    }

    page(
        "",
        &format!(
            "<h2>Upload new file:</h2>\
             <form action='/upload' method='POST' enctype='multipart/form-data'>\
             <input type='file' name='Filename' placeholder='File (*.*)' />\
             <input type='submit' name='btnSubmit' value='Upload' /></form><hr />\
             <h2>List of files</h2><table border='1'>\
             <tr><th>Type</th><th>Name</th><th>Size</th><th>Creation Date</th><th>Modified Date</th></tr>\
             {rows}</table>"
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::EntryKind;

    #[test]
    fn escape_covers_markup_and_quotes() {
        assert_eq!(
            escape("<a href='x'>&\"</a>"),
            "&lt;a href=&#39;x&#39;&gt;&amp;&quot;&lt;/a&gt;"
        );
        assert_eq!(escape("plain.txt"), "plain.txt");
    }

    #[test]
    fn listing_rows_carry_download_forms() {
        let entries = vec![
            Entry {
                name: "docs".into(),
                kind: EntryKind::Dir,
                size_bytes: 4096,
                created_at: "2024-01-01 10:00:00".into(),
                modified_at: "2024-01-02 10:00:00".into(),
            },
            Entry {
                name: "a<b>.txt".into(),
                kind: EntryKind::File,
                size_bytes: 1536,
                created_at: "2024-01-01 10:00:00".into(),
                modified_at: "2024-01-01 11:00:00".into(),
            },
        ];
        let html = listing(&entries);
        assert!(html.contains("<td>DIR</td><td>docs</td><td>4.00 KB</td>"));
        assert!(html.contains("<td>FILE</td><td>a&lt;b&gt;.txt</td><td>1.50 KB</td>"));
        assert!(html.contains("name='FilePath' value='a&lt;b&gt;.txt'"));
        assert!(html.contains("enctype='multipart/form-data'"));
        assert!(html.contains("name='Filename'"));
    }

    #[test]
    fn redirect_pages_refresh_to_target() {
        let html = upload_completed("https://files.example:8443/list");
        assert!(html.contains("content='5;url=https://files.example:8443/list'"));
        assert!(html.contains("Upload completed!"));
    }

    #[test]
    fn signup_form_fields() {
        let html = signup();
        for field in ["txtUsername", "txtPassword", "btnSubmit", "btnReset"] {
            assert!(html.contains(&format!("name='{field}'")), "{field}");
        }
    }
}
