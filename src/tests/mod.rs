use super::*;

mod timers_and_trace;
mod validation_rules;

const CONTACT_PAGE: &str = r#"
<!DOCTYPE html>
<html lang="no">
<body>
  <div class="emergency-bar"><a href="tel:+4769000000">Døgnvakt</a></div>
  <header class="header">
    <nav class="nav-desktop">
      <a id="desk-home" href="index.html">Hjem</a>
      <a id="desk-contact" href="kontakt.html">Kontakt</a>
    </nav>
    <button class="nav-toggle" aria-expanded="false"><span class="bar"></span></button>
    <nav class="nav-mobile">
      <a id="mobile-home" href="index.html">Hjem</a>
      <a id="mobile-contact" href="kontakt.html">Kontakt</a>
    </nav>
  </header>
  <main>
    <a id="call" href="tel:+4791234567">912 34 567</a>
    <a id="storm" href="/vakt" data-emergency="true">Strømbrudd?</a>
    <form id="contact-form" novalidate>
      <div class="form-group"><input id="name" name="name" type="text" required></div>
      <div class="form-group"><input id="email" name="email" type="email" required></div>
      <div class="form-group"><input id="phone" name="phone" type="tel"></div>
      <div class="form-group"><select id="service" name="service"><option value="">Velg</option><option value="elbil">Elbillader</option></select></div>
      <div class="form-group"><textarea id="message" name="message" required></textarea></div>
      <div class="hp" style="display: none"><input id="website" name="website" type="text"></div>
      <button id="send" type="submit">Send henvendelse</button>
      <div class="form-message" style="display: none"></div>
    </form>
  </main>
</body>
</html>
"#;

const SUCCESS_TEXT: &str = "Takk for din henvendelse! Vi kontakter deg innen 24 timer.";
const FAILURE_TEXT: &str = "Beklager, noe gikk galt. Vennligst prøv igjen eller ring oss direkte.";

fn contact_site(transport: &ScriptedTransport) -> Result<Site> {
    let mut site = Site::from_html(CONTACT_PAGE)?;
    site.set_transport(transport.clone());
    Ok(site)
}

fn fill_valid_form(site: &mut Site) -> Result<()> {
    site.type_text("#name", "Ola")?;
    site.type_text("#email", "ola@example.com")?;
    site.type_text("#phone", "91234567")?;
    site.type_text("#message", "hei")?;
    Ok(())
}
