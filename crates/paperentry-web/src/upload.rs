use axum::extract::Multipart;

/// An uploaded PDF with its data and metadata.
pub struct UploadedFile {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Parse a multipart form upload, accepting exactly one PDF in the `pdf` field.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<UploadedFile, String> {
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "pdf" => {
                if file.is_some() {
                    return Err("Please upload exactly one PDF file.".to_string());
                }
                let filename = field.file_name().unwrap_or("upload.pdf").to_string();
                let content_type = field.content_type().map(String::from);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| format!("Failed to read file data: {}", e))?
                    .to_vec();

                check_pdf(&filename, content_type.as_deref(), &data)?;
                file = Some(UploadedFile { filename, data });
            }
            _ => {
                // Ignore unknown fields
                let _ = field.bytes().await;
            }
        }
    }

    file.ok_or_else(|| "No file uploaded".to_string())
}

/// Accept only PDFs: declared type (if any) must be PDF, and the bytes must
/// start with the PDF magic.
fn check_pdf(filename: &str, content_type: Option<&str>, data: &[u8]) -> Result<(), String> {
    if let Some(ct) = content_type {
        let essence = ct.split(';').next().unwrap_or("").trim();
        // Browsers send octet-stream for drag-and-drop from some file managers.
        if essence != "application/pdf" && essence != "application/octet-stream" {
            return Err(format!(
                "Unsupported file type ({}). Please upload a PDF file.",
                essence
            ));
        }
    }

    if data.is_empty() {
        return Err(format!("{}: file is empty", filename));
    }
    if !data.starts_with(b"%PDF-") {
        return Err(format!(
            "{} doesn't appear to be a valid PDF. Please upload a PDF file.",
            filename
        ));
    }
    Ok(())
}
