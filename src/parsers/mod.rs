pub mod pm_xml;
