use externalize_js::BindingRecord;
use externalize_js::Catalog;
use externalize_js::Externalizer;
use externalize_js::SourceFile;

fn externalizer() -> Externalizer {
  let catalog = Catalog::from_records([BindingRecord {
    name: "vue".to_string(),
    version: "3.4.0".to_string(),
    relative_module: "dist/vue.global.js".to_string(),
    global: "Vue".to_string(),
    bindings: vec!["ref".to_string(), "version".to_string()],
    aliases: Vec::new(),
    spare: Vec::new(),
  }])
  .unwrap();
  Externalizer::from_catalog(catalog)
}

#[test]
fn no_op_law() {
  let host = externalizer();
  let source = "export const unrelated = 1;\n";
  assert!(host.transform(source).unwrap().is_none());
}

#[test]
fn wildcard_law() {
  let host = externalizer();
  let out = host.transform("export * from 'vue';\n").unwrap().unwrap();
  assert_eq!(out.code, "export var ref = Vue.ref, version = Vue.version;\n");
}

#[test]
fn default_rename_law() {
  let host = externalizer();
  let out = host
    .transform("export { ref as default } from 'vue';\n")
    .unwrap()
    .unwrap();
  assert_eq!(out.code, "export default Vue.ref;\n");
}

#[test]
fn grouped_reexport_law() {
  let host = externalizer();
  let out = host
    .transform("export { ref, version } from 'vue';\n")
    .unwrap()
    .unwrap();
  assert_eq!(out.code, "export var ref = Vue.ref, version = Vue.version;\n");
}

#[test]
fn reference_substitution_law() {
  let host = externalizer();
  let out = host
    .transform("import { version } from 'vue';\nconsole.log(version);\n")
    .unwrap()
    .unwrap();
  assert_eq!(out.code, "console.log(Vue.version);\n");
}

#[test]
fn idempotence_law() {
  let host = externalizer();
  let once = host
    .transform("import { ref } from 'vue';\nexport const value = ref(0);\n")
    .unwrap()
    .unwrap();
  assert!(host.transform(&once.code).unwrap().is_none());
}

#[test]
fn duplicate_declaration_law() {
  let host = externalizer();
  let out = host
    .transform("import { ref } from 'vue';\nvar state = 1;\nvar state = ref(2);\nstate;\n")
    .unwrap()
    .unwrap();
  assert_eq!(out.code, "var state = Vue.ref(2);\nstate;\n");
}

#[test]
fn parallel_transforms_preserve_input_order_and_independence() {
  let host = externalizer();
  let files: Vec<SourceFile> = (0..32)
    .map(|i| SourceFile {
      id: format!("module-{}.js", i),
      source: if i % 2 == 0 {
        format!("import {{ ref }} from 'vue';\nexport const value{} = ref({});\n", i, i)
      } else {
        format!("export const value{} = {};\n", i, i)
      },
    })
    .collect();
  let results = host.transform_all(files);
  assert_eq!(results.len(), 32);
  for (i, result) in results.into_iter().enumerate() {
    let file = result.unwrap();
    assert_eq!(file.id, format!("module-{}.js", i));
    if i % 2 == 0 {
      let out = file.output.expect("even modules import vue");
      assert_eq!(
        out.code,
        format!("export const value{} = Vue.ref({});\n", i, i)
      );
    } else {
      assert!(file.output.is_none());
    }
  }
}
