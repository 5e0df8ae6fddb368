//! Rendered-page fixtures shared by the extraction and handler tests.

/// Client app shell before any transcript content has rendered.
pub const LOADING_PAGE: &str = r#"<html><head><title>Call</title></head>
<body><div id="root"><div class="spinner">Loading call...</div></div></body></html>"#;

pub const EXPIRED_PAGE: &str = r#"<html><body>
<div class="error-card">
  <h2>Access to this call has expired</h2>
  <p>Page not found. Ask the owner to share it again.</p>
</div>
</body></html>"#;

pub const INVALID_PAGE: &str = r#"<html><body><h1>404</h1><p>Page not found</p></body></html>"#;

/// Container rendered, but it never received any turn blocks.
pub const EMPTY_CONTAINER_PAGE: &str = r#"<html><body>
<h1>Transcript</h1>
<section aria-label="Call transcript"><div class="placeholder">Nothing here yet</div></section>
</body></html>"#;

/// Block-level layout without word spans: speaker marker, timestamp and text container.
pub const LEGACY_PAGE: &str = r#"<html><head><title>Quarterly sync</title></head><body>
<h1>Transcript</h1>
<section aria-label="Call transcript">
  <div class="TranscriptGroup-module__groupItem">
    <span class="only-speaker-visible">Sarah Chen</span>
    <div class="TranscriptGroup-module__timestamp_x1"><span>0:05</span></div>
    <div class="TranscriptGroup-module__textContent_a9">Thanks everyone for
      joining   today.</div>
  </div>
  <div class="TranscriptGroup-module__groupItem">
    <span class="speaker-name" data-speaker="Marcus Webb"></span>
    <div class="TranscriptGroup-module__timestamp_x1"><span>0:12</span></div>
    <div class="TranscriptGroup-module__textContent_a9">Happy to be here.</div>
  </div>
  <div class="TranscriptGroup-module__groupItem">
    <span class="only-speaker-visible">Sarah Chen</span>
    <div class="TranscriptGroup-module__textContent_a9">   </div>
  </div>
  <div class="TranscriptGroup-module__groupItem">
    <div class="TranscriptGroup-module__timestamp_x1"><span>0:20</span></div>
    <div class="TranscriptGroup-module__textContent_a9">Let me share my screen.</div>
  </div>
</section>
</body></html>"#;

/// Word-span layout with per-word timing attributes.
pub const WORD_TIMED_PAGE: &str = r#"<html><body>
<h1>Transcript</h1>
<section aria-label="Call transcript">
  <div class="TranscriptGroup-module__groupItem_q1" data-start="9000" data-end="12500">
    <span class="only-speaker-visible">Sarah Chen</span>
    <div class="TranscriptGroup-module__timestamp_z"><span>0:02</span></div>
    <div class="TranscriptGroup-module__textContent_k">
      <span data-start="2000" data-end="2400"> Welcome </span>
      <span data-start="2400" data-end="2900">back</span>
      <span data-start="2900" data-end="3500">everyone.</span>
    </div>
  </div>
  <div class="TranscriptGroup-module__groupItem_q1" data-start="4000" data-end="6250">
    <span class="only-speaker-visible">Marcus Webb</span>
    <div class="TranscriptGroup-module__textContent_k">
      <span data-start="abc" data-end="4500">Quick</span>
      <span data-start="4500" data-end="6250.4">update.</span>
    </div>
  </div>
  <div class="TranscriptGroup-module__groupItem_q1">
    <span class="only-speaker-visible">Priya Patel</span>
    <div class="TranscriptGroup-module__textContent_k">No timing here.</div>
  </div>
  <div class="TranscriptGroup-module__groupItem_q1">
    <span class="only-speaker-visible">Sarah Chen</span>
    <div class="TranscriptGroup-module__textContent_k">
      <span data-start="7000" data-end="6000">Rewind.</span>
    </div>
  </div>
  <div class="TranscriptGroup-module__groupItem_q1">
    <span class="only-speaker-visible">Marcus Webb</span>
    <div class="TranscriptGroup-module__textContent_k"><span data-start="8000" data-end="8100">  </span></div>
  </div>
</section>
</body></html>"#;

/// Variant that prints the timestamp inside the speaker label.
pub const COMBINED_LABEL_PAGE: &str = r#"<html><body>
<section aria-label="Call transcript">
  <div class="TranscriptGroup-module__groupItem">
    <span class="only-speaker-visible">Alex Johnson 2:15</span>
    <div class="TranscriptGroup-module__timestamp"><span>9:59</span></div>
    <div class="TranscriptGroup-module__textContent">Let's look at the numbers.</div>
  </div>
  <div class="TranscriptGroup-module__groupItem">
    <span class="only-speaker-visible">R2D2</span>
    <div class="TranscriptGroup-module__textContent">Beep.</div>
  </div>
</section>
</body></html>"#;

/// No speaker markers anywhere on the page.
pub const ANONYMOUS_PAGE: &str = r#"<html><body>
<section aria-label="Call transcript">
  <div class="TranscriptGroup-module__groupItem">
    <div class="TranscriptGroup-module__textContent">Hello?</div>
  </div>
  <div class="TranscriptGroup-module__groupItem">
    <div class="TranscriptGroup-module__textContent">Hi there.</div>
  </div>
</section>
</body></html>"#;
