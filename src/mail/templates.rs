//! Mail templates

/// Subject and bodies for one outbound message.
pub struct MailContent {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

/// The "signed document attached" notification sent to the client, cc the
/// advisor, once a document has been signed.
pub fn signed_document_mail(brand: &str) -> MailContent {
    let subject = format!("[{brand}] Document signé");

    let text_body = format!(
        "Bonjour,\n\n\
         Vous trouverez le document signé en pièce jointe de ce mail.\n\n\
         Si vous avez des questions, vous pouvez vous adresser à votre conseiller.\n\n\
         Merci pour votre confiance,\n{brand}"
    );

    let html_body = format!(
        r#"<!doctype html>
<html lang="fr">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <title>{brand} – Document signé</title>
</head>
<body style="background:#f4f6f8; margin:0; padding:0; font-family:Arial,Helvetica,sans-serif;">
  <table role="presentation" cellpadding="0" cellspacing="0" width="100%" style="background:#f4f6f8;">
    <tr>
      <td align="center">
        <table role="presentation" cellpadding="0" cellspacing="0" width="600" style="width:600px; max-width:600px; background:#ffffff;">
          <tr>
            <td align="center" style="background:#0b3d35; padding:28px;">
              <span style="font-size:28px; line-height:34px; color:#ffffff; font-weight:700;">{brand}</span>
            </td>
          </tr>
          <tr>
            <td style="padding:28px; color:#0b0c0d;">
              <p style="margin:0 0 18px 0; font-size:16px; line-height:24px; font-weight:700;">Bonjour,</p>
              <p style="margin:0 0 18px 0; font-size:16px; line-height:24px;">
                Vous trouverez le document signé en pièce jointe de ce mail.
              </p>
              <p style="margin:0 0 22px 0; font-size:16px; line-height:24px;">
                Si vous avez des questions, vous pouvez vous adresser à votre conseiller.
              </p>
              <p style="margin:0; font-size:16px; line-height:24px;">
                Merci pour votre confiance,<br>
                <strong>{brand}.</strong>
              </p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>"#
    );

    MailContent {
        subject,
        text_body,
        html_body,
    }
}
