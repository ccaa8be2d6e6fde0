use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use fauxtree_core::{
    Event, Family, Gender, Handle, Media, Note, Person, Place, Record, RecordKind, RecordStore,
    Relationship,
};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event as XmlEvent};

use super::{CountingWriter, RecordIds};
use crate::errors::GenerationError;

const GRAMPS_XML_VERSION: &str = "1.7.1";

/// Write an uncompressed Gramps XML database.
pub fn write_gramps<S: RecordStore + ?Sized>(
    store: &S,
    path: &Path,
) -> Result<u64, GenerationError> {
    let ids = RecordIds::assign(store);
    let counting = CountingWriter::new(BufWriter::new(File::create(path)?));
    let mut xml = GrampsWriter {
        writer: Writer::new_with_indent(counting, b' ', 2),
        ids: &ids,
    };

    xml.writer
        .write_event(XmlEvent::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let doctype = format!(
        "database PUBLIC \"-//Gramps//DTD Gramps XML {v}//EN\" \
         \"http://gramps-project.org/xml/{v}/grampsxml.dtd\"",
        v = GRAMPS_XML_VERSION
    );
    xml.writer
        .write_event(XmlEvent::DocType(BytesText::from_escaped(doctype)))?;
    let namespace = format!("http://gramps-project.org/xml/{GRAMPS_XML_VERSION}/");
    xml.start("database", &[("xmlns", namespace.as_str())])?;

    xml.start("header", &[])?;
    let created = chrono::Utc::now().format("%Y-%m-%d").to_string();
    xml.empty(
        "created",
        &[
            ("date", created.as_str()),
            ("version", env!("CARGO_PKG_VERSION")),
        ],
    )?;
    xml.end("header")?;

    xml.section(store, "events", RecordKind::Event, &[], |xml, record| match record {
        Record::Event(event) => xml.event(event),
        _ => Ok(()),
    })?;

    let default = store
        .default_person()
        .map(|handle| ids.get(handle).to_string())
        .unwrap_or_default();
    let people_attrs: Vec<(&str, &str)> = if default.is_empty() {
        Vec::new()
    } else {
        vec![("default", default.as_str())]
    };
    xml.section(store, "people", RecordKind::Person, &people_attrs, |xml, record| {
        match record {
            Record::Person(person) => xml.person(person),
            _ => Ok(()),
        }
    })?;
    xml.section(store, "families", RecordKind::Family, &[], |xml, record| {
        match record {
            Record::Family(family) => xml.family(family),
            _ => Ok(()),
        }
    })?;
    xml.section(store, "places", RecordKind::Place, &[], |xml, record| match record {
        Record::Place(place) => xml.place(place),
        _ => Ok(()),
    })?;
    xml.section(store, "objects", RecordKind::Media, &[], |xml, record| match record {
        Record::Media(media) => xml.media(media),
        _ => Ok(()),
    })?;
    xml.section(store, "notes", RecordKind::Note, &[], |xml, record| match record {
        Record::Note(note) => xml.note(note),
        _ => Ok(()),
    })?;

    xml.end("database")?;

    let mut counting = xml.writer.into_inner();
    counting.write_all(b"\n")?;
    counting.flush()?;
    Ok(counting.bytes_written())
}

struct GrampsWriter<'i, W: Write> {
    writer: Writer<W>,
    ids: &'i RecordIds,
}

impl<W: Write> GrampsWriter<'_, W> {
    /// Write `<name>` around all records of `kind`. Empty sections are left
    /// out.
    fn section<S, F>(
        &mut self,
        store: &S,
        name: &str,
        kind: RecordKind,
        attrs: &[(&str, &str)],
        mut write: F,
    ) -> Result<(), GenerationError>
    where
        S: RecordStore + ?Sized,
        F: FnMut(&mut Self, &Record) -> Result<(), GenerationError>,
    {
        if !store.records().any(|record| record.kind() == kind) {
            return Ok(());
        }
        self.start(name, attrs)?;
        for record in store.records().filter(|record| record.kind() == kind) {
            write(self, record)?;
        }
        self.end(name)
    }

    fn event(&mut self, event: &Event) -> Result<(), GenerationError> {
        let handle = gramps_handle(&event.handle);
        let id = self.ids.get(&event.handle).to_string();
        self.start("event", &[("handle", handle.as_str()), ("id", id.as_str())])?;
        self.text("type", event.kind.as_str())?;
        self.empty("dateval", &[("val", event.date.to_string().as_str())])?;
        if let Some(place) = &event.place {
            self.reference("place", place)?;
        }
        if let Some(note) = &event.note {
            self.reference("noteref", note)?;
        }
        for media in &event.media_refs {
            self.reference("objref", media)?;
        }
        self.end("event")
    }

    fn person(&mut self, person: &Person) -> Result<(), GenerationError> {
        let handle = gramps_handle(&person.handle);
        let id = self.ids.get(&person.handle).to_string();
        self.start("person", &[("handle", handle.as_str()), ("id", id.as_str())])?;
        self.text(
            "gender",
            match person.gender {
                Gender::Male => "M",
                Gender::Female => "F",
            },
        )?;
        self.start("name", &[("type", "Birth Name")])?;
        self.text("first", &person.name.first_name)?;
        self.text("surname", &person.name.surname)?;
        self.end("name")?;
        for event in &person.event_refs {
            let hlink = gramps_handle(event);
            self.empty("eventref", &[("hlink", hlink.as_str()), ("role", "Primary")])?;
        }
        for media in &person.media_refs {
            self.reference("objref", media)?;
        }
        if let Some(family) = &person.parent_family {
            self.reference("childof", family)?;
        }
        for family in &person.families {
            self.reference("parentin", family)?;
        }
        for note in &person.note_refs {
            self.reference("noteref", note)?;
        }
        self.end("person")
    }

    fn family(&mut self, family: &Family) -> Result<(), GenerationError> {
        let handle = gramps_handle(&family.handle);
        let id = self.ids.get(&family.handle).to_string();
        self.start("family", &[("handle", handle.as_str()), ("id", id.as_str())])?;
        let relationship = match family.relationship {
            Relationship::Married => "Married",
            Relationship::Unmarried => "Unmarried",
        };
        self.empty("rel", &[("type", relationship)])?;
        if let Some(father) = &family.father {
            self.reference("father", father)?;
        }
        if let Some(mother) = &family.mother {
            self.reference("mother", mother)?;
        }
        for event in &family.event_refs {
            let hlink = gramps_handle(event);
            self.empty("eventref", &[("hlink", hlink.as_str()), ("role", "Family")])?;
        }
        for media in &family.media_refs {
            self.reference("objref", media)?;
        }
        for child in &family.children {
            self.reference("childref", child)?;
        }
        self.end("family")
    }

    fn place(&mut self, place: &Place) -> Result<(), GenerationError> {
        let handle = gramps_handle(&place.handle);
        let id = self.ids.get(&place.handle).to_string();
        self.start(
            "placeobj",
            &[
                ("handle", handle.as_str()),
                ("id", id.as_str()),
                ("type", place.place_type.as_str()),
            ],
        )?;
        self.text("ptitle", &place.name)?;
        self.empty("pname", &[("value", place.name.as_str())])?;
        let (long, lat) = (place.longitude.to_string(), place.latitude.to_string());
        self.empty("coord", &[("long", long.as_str()), ("lat", lat.as_str())])?;
        self.end("placeobj")
    }

    fn media(&mut self, media: &Media) -> Result<(), GenerationError> {
        let handle = gramps_handle(&media.handle);
        let id = self.ids.get(&media.handle).to_string();
        self.start("object", &[("handle", handle.as_str()), ("id", id.as_str())])?;
        let src = media.path.display().to_string();
        self.empty(
            "file",
            &[
                ("src", src.as_str()),
                ("mime", media.mime_type.as_str()),
                ("checksum", media.checksum.as_str()),
                ("description", media.caption.as_str()),
            ],
        )?;
        self.end("object")
    }

    fn note(&mut self, note: &Note) -> Result<(), GenerationError> {
        let handle = gramps_handle(&note.handle);
        let id = self.ids.get(&note.handle).to_string();
        self.start(
            "note",
            &[
                ("handle", handle.as_str()),
                ("id", id.as_str()),
                ("type", "General"),
            ],
        )?;
        self.text("text", &note.text)?;
        self.end("note")
    }

    fn reference(&mut self, name: &str, target: &Handle) -> Result<(), GenerationError> {
        let hlink = gramps_handle(target);
        self.empty(name, &[("hlink", hlink.as_str())])
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), GenerationError> {
        let element = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(XmlEvent::Start(element))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), GenerationError> {
        self.writer.write_event(XmlEvent::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), GenerationError> {
        let element = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(XmlEvent::Empty(element))?;
        Ok(())
    }

    fn text(&mut self, name: &str, value: &str) -> Result<(), GenerationError> {
        self.start(name, &[])?;
        self.writer.write_event(XmlEvent::Text(BytesText::new(value)))?;
        self.end(name)
    }
}

fn gramps_handle(handle: &Handle) -> String {
    format!("_{handle}")
}
